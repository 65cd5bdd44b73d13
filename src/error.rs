//! Error types for the scheduler core.

use serde::{Deserialize, Serialize};

use crate::ids::ThreadId;

/// Errors raised by the scheduler itself. These are programming errors in
/// how the pool is driven, never failures of animation logic (those travel
/// as [`ThreadFailure`] inside outcomes).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FlowError {
    /// A terminal thread was asked to take another step.
    #[error("thread {thread:?} is terminal and cannot be resumed")]
    InvalidState { thread: ThreadId },

    /// A join or cancel named a handle the pool does not know.
    #[error("unknown thread handle {thread:?}")]
    UnknownThread { thread: ThreadId },
}

impl FlowError {
    /// The handle the error is about.
    #[inline]
    pub fn thread(&self) -> ThreadId {
        match self {
            Self::InvalidState { thread } | Self::UnknownThread { thread } => *thread,
        }
    }
}

/// Failure of a coroutine body, carried through outcomes and join points.
///
/// Cancellation is deliberately *not* represented here; a canceled thread
/// resolves joins with a distinct canceled outcome so callers can tell
/// "stopped early" from "errored".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("thread failed: {message}")]
pub struct ThreadFailure {
    pub message: String,
}

impl ThreadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ThreadFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ThreadFailure {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reports_thread() {
        let err = FlowError::UnknownThread {
            thread: ThreadId(7),
        };
        assert_eq!(err.thread(), ThreadId(7));
        assert!(err.to_string().contains("unknown thread"));
    }

    #[test]
    fn failure_serde_roundtrip() {
        let failure = ThreadFailure::new("tween target vanished");
        let json = serde_json::to_string(&failure).unwrap();
        let back: ThreadFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(failure, back);
    }
}
