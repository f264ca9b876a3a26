//! Application services: catalog, article rendering, and content refresh.

pub mod articles;
pub mod catalog;
pub mod error;
pub mod readme;
pub mod refresh;
pub mod render;
pub mod sync;
pub mod webhook;
