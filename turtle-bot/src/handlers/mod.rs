//! Chain handlers wrapped around the story workflow.

mod auth;
mod logging;

pub use auth::AuthHandler;
pub use logging::LoggingHandler;
