//! Unified error handling for slirc-bot.
//!
//! Errors are grouped by where they surface:
//! - [`RegistrationError`]: startup wiring, fatal before the bot connects.
//! - [`HandlerError`]: one module invocation failed; logged and contained.
//! - [`ConnectionError`]: the IRC link failed; ends `run()`.
//! - [`BotError`]: what the facade returns to its caller.

use crate::core::BotState;
use crate::db::DbError;
use crate::proto::ProtocolError;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Registration Errors (startup)
// ============================================================================

/// Errors raised while modules register commands and scanners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("trigger {trigger:?} from module {module} is already registered by module {existing}")]
    DuplicateTrigger {
        trigger: String,
        module: String,
        existing: String,
    },

    #[error("command from module {0} has no triggers")]
    NoTriggers(String),

    #[error("trigger {0:?} must be a single non-empty token")]
    InvalidTrigger(String),

    #[error("registration is closed once the bot has connected")]
    RegistrationClosed,
}

// ============================================================================
// Handler Errors (per invocation)
// ============================================================================

/// Errors a module handler can return. The dispatcher logs them and moves on.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),

    #[error("handler panicked")]
    Panicked,

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage_error",
            Self::Http(_) => "http_error",
            Self::TimedOut(_) => "timed_out",
            Self::Panicked => "panicked",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for handlers: `Ok(true)` when the handler acted on the line.
pub type HandlerResult = Result<bool, HandlerError>;

// ============================================================================
// Connection Errors (IRC link)
// ============================================================================

/// Errors from the underlying chat connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("timed out while {0}")]
    Timeout(&'static str),

    #[error("server closed the link: {0}")]
    ServerError(String),

    #[error("connection closed")]
    Closed,
}

// ============================================================================
// Bot Errors (facade)
// ============================================================================

/// Errors returned by the [`crate::core::Bot`] facade.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("operation requires state {expected:?}, bot is {actual:?}")]
    InvalidState {
        expected: BotState,
        actual: BotState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_codes() {
        assert_eq!(HandlerError::Panicked.error_code(), "panicked");
        assert_eq!(
            HandlerError::TimedOut(Duration::from_secs(1)).error_code(),
            "timed_out"
        );
        assert_eq!(
            HandlerError::Internal("test".into()).error_code(),
            "internal_error"
        );
    }

    #[test]
    fn test_duplicate_trigger_message_names_both_modules() {
        let err = RegistrationError::DuplicateTrigger {
            trigger: "!a".into(),
            module: "second".into(),
            existing: "first".into(),
        };
        let text = err.to_string();
        assert!(text.contains("\"!a\""));
        assert!(text.contains("second"));
        assert!(text.contains("first"));
    }
}
