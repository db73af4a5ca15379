//! # turtle-core
//!
//! Core types and traits for the story bot: [`MessagingGateway`], [`Handler`], update and user types,
//! error taxonomy, error reporting and tracing initialization. Transport-agnostic; used by
//! handler-chain, story-workflow and turtle-telegram.

pub mod error;
pub mod gateway;
pub mod logger;
pub mod reporter;
pub mod types;

pub use error::{HandlerError, Result, TurtleError};
pub use gateway::{
    Button, Keyboard, MessagingGateway, PhotoOptions, Reaction, SendOptions, SentMessage,
};
pub use logger::init_tracing;
pub use reporter::{ErrorReporter, TracingErrorReporter};
pub use types::{
    Chat, Handler, HandlerResponse, MessageSnapshot, ToCoreUpdate, ToCoreUser, Update, UpdateKind,
    User,
};
