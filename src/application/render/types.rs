use thiserror::Error;

use crate::domain::articles::MarkupKind;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Article filename, used for diagnostics only.
    pub filename: String,
    pub markup: MarkupKind,
    pub source: String,
}

impl RenderRequest {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            markup: MarkupKind::from_filename(&filename),
            filename,
            source: source.into(),
        }
    }

    /// Decode raw file bytes, rejecting content that is not UTF-8.
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, RenderError> {
        let filename = filename.into();
        match String::from_utf8(bytes) {
            Ok(source) => Ok(Self::new(filename, source)),
            Err(_) => Err(RenderError::Encoding { filename }),
        }
    }
}

/// HTML body fragment produced for an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub html: String,
}

/// Structured errors surfaced by the rendering pipeline. Messages may name the
/// article but never carry filesystem paths.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed for `{filename}`: {message}")]
    Markdown { filename: String, message: String },
    #[error("article `{filename}` is not valid UTF-8")]
    Encoding { filename: String },
}

/// Implementations must be deterministic: the same request yields the same
/// output or error.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
