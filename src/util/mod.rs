//! Small helpers shared across layers.

pub(crate) mod lock;
pub mod paths;
