//! # Broker Error Types
//!
//! Structured error handling for the broker using thiserror. The taxonomy
//! separates fatal invariant breaks (`ProtocolViolation`, `HandlerLookup`)
//! from recoverable caller mistakes (`AlreadyStarted`) and the one bounded
//! operation that may legitimately expire (`Timeout` on a stop join).

use crate::message::Message;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// A lifecycle handshake carried the wrong identity, peer token, or
    /// payload. This indicates a broken invariant, not a transient fault:
    /// it is surfaced immediately and never retried.
    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },

    /// `start` was called on a controller whose service is already running.
    #[error("service is already started")]
    AlreadyStarted,

    /// No handler matched a message. Unreachable once the catch-all binding
    /// is installed; observing it means an internal-consistency bug.
    #[error("no handler matched message: {message}")]
    HandlerLookup { message: String },

    /// A bounded wait expired. Non-fatal: the caller may retry or escalate.
    #[error("{operation} did not complete within {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// A transport channel failed underneath the broker.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Anything that should not happen in a healthy process, such as a
    /// panicked worker thread or a failed thread spawn.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SwitchboardError {
    /// Create a protocol violation error.
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Create a handler lookup error for the offending message.
    pub fn handler_lookup(message: &Message) -> Self {
        Self::HandlerLookup {
            message: message.to_string(),
        }
    }

    /// Create a timeout error for a named operation.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SwitchboardError>;
