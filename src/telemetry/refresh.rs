use jiff::Timestamp;
use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// Structured events for one refresh attempt, keyed by a generated id so a
/// leader's lifecycle can be correlated across interleaved requests.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn emit_start(&self, at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = %at,
            "refresh.start"
        );
    }

    pub fn emit_settled(&self, waiters: usize, at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            waiters,
            timestamp = %at,
            "refresh.settled"
        );
    }

    pub fn emit_failure(&self, error: &Error, at: Timestamp) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = %at,
            error = %error,
            "refresh.failure"
        );
    }
}
