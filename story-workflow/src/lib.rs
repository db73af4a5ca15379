//! # story-workflow
//!
//! Per-chat story pipeline: date → topics → story → image prompt → image → preview → schedule.
//!
//! ## Modules
//!
//! - [`engine`] – [`WorkflowEngine`]: runs steps against the collaborators and persists sessions
//! - [`transitions`] – pure step functions producing a [`Transition`]
//! - [`command`] / [`action`] – operator commands and inline-button payloads, decoded once
//! - [`content`] – [`ContentProvider`] and its LLM implementation
//! - [`polling`] – bounded image job polling
//! - [`staging`] – image files on local disk
//! - [`date`], [`topics`], [`keyboard`], [`messages`] – formatting and parsing helpers
//! - [`handler`] – [`WorkflowHandler`] for the handler chain

pub mod action;
pub mod clock;
pub mod command;
pub mod config;
pub mod content;
pub mod date;
pub mod engine;
pub mod error;
pub mod handler;
pub mod keyboard;
pub mod messages;
pub mod polling;
pub mod staging;
pub mod topics;
pub mod transitions;

pub use action::{Action, ActionDecodeError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{OperatorCommand, Trigger};
pub use config::{PollPolicy, ScheduleTime, WorkflowConfig};
pub use content::{ContentProvider, LlmContentProvider, StoryDirective};
pub use engine::{DispatchOutcome, WorkflowEngine};
pub use error::{ValidationError, WorkflowError};
pub use handler::WorkflowHandler;
pub use transitions::{Outbound, SessionChange, Transition};
