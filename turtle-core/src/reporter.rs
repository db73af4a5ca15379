//! Error reporting collaborator for failures that escape the handler chain.

use crate::types::Update;
use tracing::error;

/// Receives unhandled errors caught at the dispatch boundary.
pub trait ErrorReporter: Send + Sync {
    fn capture(&self, error: &(dyn std::error::Error + 'static), update: Option<&Update>);
}

/// Reports through tracing at error level with update context attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn capture(&self, err: &(dyn std::error::Error + 'static), update: Option<&Update>) {
        match update {
            Some(update) => error!(
                error = %err,
                chat_id = update.chat.id,
                user_id = update.user.id,
                update_kind = update.kind_name(),
                "Unhandled error while processing update"
            ),
            None => error!(error = %err, "Unhandled error"),
        }
    }
}
