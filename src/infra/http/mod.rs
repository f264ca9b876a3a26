mod middleware;
mod public;
mod webhooks;

pub use public::{HttpState, build_router};
