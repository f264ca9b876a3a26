//! Article rendering.
//!
//! The pipeline is pure: it accepts article source text and produces an HTML
//! body fragment or a structured error. Caching and file access happen in the
//! caller.

mod service;
mod types;

pub use service::{ComrakRenderService, render_service};
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService};
