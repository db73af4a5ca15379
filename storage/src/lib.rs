//! Storage crate: session persistence and the scheduled post outbox.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – Session, SessionPatch, Stage, StagedImage, ScheduledPost
//! - [`session_store`] – SessionStore trait, SQLite and in-memory implementations
//! - [`scheduled_post_repo`] – ScheduledPostRepository (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager

mod error;
mod models;
mod scheduled_post_repo;
mod session_store;
mod sqlite_pool;

pub use error::StorageError;
pub use models::{PostStatus, ScheduledPost, Session, SessionPatch, Stage, StagedImage};
pub use scheduled_post_repo::ScheduledPostRepository;
pub use session_store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
pub use sqlite_pool::SqlitePoolManager;
