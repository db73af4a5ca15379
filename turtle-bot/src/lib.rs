//! # turtle-bot
//!
//! Application crate: env config, component wiring, auth and logging handlers, morning trigger
//! and the `little-turtle` CLI.

pub mod cli;
pub mod components;
pub mod config;
pub mod handlers;
pub mod morning;
pub mod runner;

pub use cli::{load_config, Cli, Commands};
pub use components::{build_bot_components, build_engine, build_handler_chain, BotComponents};
pub use config::{BaseConfig, BotConfig, StoryConfig};
pub use handlers::{AuthHandler, LoggingHandler};
pub use morning::{next_run, MorningTrigger, RunStarter};
pub use runner::run_bot;
