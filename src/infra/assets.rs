//! Static asset serving from the configured static directory.

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use tokio::fs;
use tracing::{info, warn};

use crate::{application::error::ErrorReport, util::paths::relative_within};

const SOURCE: &str = "infra::assets::serve";

/// Files under one directory, served read-only.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    /// Canonical root; `None` when the directory does not exist.
    root: Option<PathBuf>,
}

impl StaticAssets {
    pub fn new(directory: &Path) -> Self {
        let root = match directory.canonicalize() {
            Ok(root) => Some(root),
            Err(err) => {
                info!(
                    target = "taccuino::assets",
                    directory = %directory.display(),
                    error = %err,
                    "Static directory unavailable; static routes will return 404"
                );
                None
            }
        };
        Self { root }
    }

    pub async fn serve(&self, raw_path: &str) -> Response {
        let Some(path) = self.resolve(raw_path).await else {
            return not_found_response();
        };

        match fs::read(&path).await {
            Ok(contents) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                build_response(Bytes::from(contents), mime)
            }
            Err(err) => {
                warn!(
                    target = "taccuino::assets",
                    path = %path.display(),
                    error = %err,
                    "Failed to read static asset"
                );
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                    .attach(&mut response);
                response
            }
        }
    }

    async fn resolve(&self, raw_path: &str) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        let relative = relative_within(raw_path)?;
        let candidate = fs::canonicalize(root.join(relative)).await.ok()?;
        if !candidate.starts_with(root) {
            return None;
        }
        let metadata = fs::metadata(&candidate).await.ok()?;
        metadata.is_file().then_some(candidate)
    }
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}
