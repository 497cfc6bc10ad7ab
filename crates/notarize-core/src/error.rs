//! Error types for notarize-core

use std::time::Duration;

use thiserror::Error;

use crate::types::{Info, Log};

/// Service code: the submission id is not known yet (still queued).
pub const CODE_NOT_FOUND: i64 = 1519;

/// Service code: the network became unavailable; retry.
pub const CODE_NETWORK_UNAVAILABLE: i64 = -19000;

/// Error reported by a remote notary operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,

    /// Numeric codes carried by the service response, if any.
    pub codes: Vec<i64>,
}

impl RemoteError {
    /// An error with no service codes (spawn failures, malformed output, ...).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            codes: Vec::new(),
        }
    }

    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            codes: vec![code],
        }
    }

    pub fn contains_code(&self, code: i64) -> bool {
        self.codes.contains(&code)
    }

    /// Decide which retry policy applies while polling `phase`.
    ///
    /// Each phase only looks for its own retry code: 1519 while queued,
    /// -19000 while polling info or log. Other codes in the same error
    /// are ignored.
    pub fn classify(&self, phase: PollPhase) -> ErrorClass {
        match phase {
            PollPhase::QueueWait if self.contains_code(CODE_NOT_FOUND) => {
                ErrorClass::QueuedNotFound
            }
            PollPhase::Info | PollPhase::Log if self.contains_code(CODE_NETWORK_UNAVAILABLE) => {
                ErrorClass::TransientUnavailable
            }
            _ => ErrorClass::Hard,
        }
    }
}

/// Retry class of a [`RemoteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Code 1519. Only meaningful while waiting in the queue.
    QueuedNotFound,
    /// Code -19000. Retried after a backoff.
    TransientUnavailable,
    /// Everything else.
    Hard,
}

/// Remote view being polled when a hard failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    QueueWait,
    Info,
    Log,
}

impl std::fmt::Display for PollPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollPhase::QueueWait => write!(f, "queue wait"),
            PollPhase::Info => write!(f, "info"),
            PollPhase::Log => write!(f, "log"),
        }
    }
}

/// Errors that end a notarization run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotarizeError {
    /// The request is missing required fields
    #[error("invalid submission request: {0}")]
    InvalidRequest(String),

    /// The submit call failed; never retried
    #[error("submission failed: {0}")]
    Submission(#[source] RemoteError),

    /// A non-retryable error while polling
    #[error("{phase} polling failed: {source}")]
    Remote {
        phase: PollPhase,
        #[source]
        source: RemoteError,
    },

    /// Both the info and the log ended as Invalid
    #[error("package is invalid")]
    InvalidPackage,

    /// The cancellation signal fired
    #[error("notarization cancelled")]
    Cancelled,

    /// The configured overall deadline elapsed
    #[error("notarization deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl NotarizeError {
    /// The remote error behind this failure, if there is one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            NotarizeError::Submission(e) => Some(e),
            NotarizeError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A failed run together with whatever state was retained before it failed.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct NotarizeFailure {
    #[source]
    pub error: NotarizeError,

    /// Last successfully fetched info (or the id stub). `None` if submit failed.
    pub info: Option<Info>,

    /// Last successfully fetched log. `None` if the log phase never started.
    pub log: Option<Log>,
}

/// Result type for notarization runs
pub type Result<T> = std::result::Result<T, NotarizeFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_codes() {
        let not_found = RemoteError::with_code("not found", 1519);
        assert_eq!(not_found.classify(PollPhase::QueueWait), ErrorClass::QueuedNotFound);
        assert_eq!(not_found.classify(PollPhase::Info), ErrorClass::Hard);

        let offline = RemoteError::with_code("offline", -19000);
        assert_eq!(offline.classify(PollPhase::Info), ErrorClass::TransientUnavailable);
        assert_eq!(offline.classify(PollPhase::Log), ErrorClass::TransientUnavailable);
        assert_eq!(offline.classify(PollPhase::QueueWait), ErrorClass::Hard);

        let auth = RemoteError::with_code("auth", 401);
        assert_eq!(auth.classify(PollPhase::Info), ErrorClass::Hard);
        assert_eq!(RemoteError::message("boom").classify(PollPhase::Log), ErrorClass::Hard);
    }

    #[test]
    fn test_classify_looks_at_every_code() {
        let err = RemoteError {
            message: "multiple".to_string(),
            codes: vec![7, -19000],
        };
        assert_eq!(err.classify(PollPhase::Info), ErrorClass::TransientUnavailable);
    }

    #[test]
    fn test_classify_mixed_codes_depends_on_phase() {
        let err = RemoteError {
            message: "mixed".to_string(),
            codes: vec![1519, -19000],
        };
        assert_eq!(err.classify(PollPhase::QueueWait), ErrorClass::QueuedNotFound);
        assert_eq!(err.classify(PollPhase::Info), ErrorClass::TransientUnavailable);
        assert_eq!(err.classify(PollPhase::Log), ErrorClass::TransientUnavailable);
    }

    #[test]
    fn test_invalid_package_message() {
        assert_eq!(NotarizeError::InvalidPackage.to_string(), "package is invalid");
    }
}
