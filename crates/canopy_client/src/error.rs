//! Error types for the client.

use crate::transaction::{RefState, TransactionFailure};
use canopy_protocol::{Path, ProtocolError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the store or running a transaction.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The round trip exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The transport was closed.
    #[error("not connected to store")]
    NotConnected,

    /// The store answered with an unexpected status.
    #[error("store responded with status {status}: {message}")]
    Server {
        /// Status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Malformed path, body or response.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The transaction API was used incorrectly.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A conditional write was rejected because the node changed.
    #[error(transparent)]
    TransactionFailed(Box<TransactionFailure>),

    /// The transaction callback gave up.
    #[error("transaction aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },

    /// The transaction callback failed with its own error.
    #[error("transaction callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Misuse of the transaction API. Signals a caller bug, never a lost race.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// `set`/`remove` on a reference that was not snapshotted in this attempt.
    #[error("{operation} on {path} without a snapshot of it in this transaction")]
    NoSnapshot {
        /// Operation name.
        operation: &'static str,
        /// Path of the reference.
        path: Path,
    },

    /// `set`/`remove` on a reference whose last write already settled.
    #[error("{operation} on {path} after it was already {state}; snapshot it again first")]
    AlreadySettled {
        /// Operation name.
        operation: &'static str,
        /// Path of the reference.
        path: Path,
        /// State the reference is in.
        state: RefState,
    },
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Aborts a transaction from inside its callback.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Wraps a caller error raised inside a transaction callback.
    pub fn callback(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Callback(Box::new(err))
    }

    /// Returns true if the transport-level failure can be retried.
    ///
    /// Conflicts are not included; retrying those is the transaction
    /// runner's decision.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { retryable, .. } => *retryable,
            ClientError::Timeout => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if a conditional write lost a race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::TransactionFailed(_))
    }

    /// Returns true if the transaction API was misused.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, ClientError::Usage(_))
    }

    /// Conflict details, if this is a conflict.
    pub fn as_transaction_failure(&self) -> Option<&TransactionFailure> {
        match self {
            ClientError::TransactionFailed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Consumes the error, returning the conflict details if any.
    pub fn into_transaction_failure(self) -> Result<TransactionFailure, ClientError> {
        match self {
            ClientError::TransactionFailed(failure) => Ok(*failure),
            other => Err(other),
        }
    }
}

impl From<TransactionFailure> for ClientError {
    fn from(failure: TransactionFailure) -> Self {
        ClientError::TransactionFailed(Box::new(failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ClientError::transport_retryable("connection reset").is_retryable());
        assert!(!ClientError::transport_fatal("invalid certificate").is_retryable());
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Server {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!ClientError::Server {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!ClientError::aborted("nope").is_retryable());
    }

    #[test]
    fn usage_error_is_not_a_conflict() {
        let err: ClientError = UsageError::NoSnapshot {
            operation: "set",
            path: Path::parse("/a").unwrap(),
        }
        .into();
        assert!(err.is_usage_error());
        assert!(!err.is_conflict());
        assert!(err.as_transaction_failure().is_none());
        assert!(err.into_transaction_failure().is_err());
    }

    #[test]
    fn error_display() {
        let err = ClientError::NotConnected;
        assert_eq!(err.to_string(), "not connected to store");

        let err: ClientError = UsageError::AlreadySettled {
            operation: "remove",
            path: Path::parse("/a/b").unwrap(),
            state: RefState::Committed,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("remove"));
        assert!(msg.contains("/a/b"));
        assert!(msg.contains("committed"));
    }

    #[test]
    fn callback_error_keeps_source() {
        use std::error::Error as _;

        let inner = std::io::Error::other("validation failed");
        let err = ClientError::callback(inner);
        assert!(err.to_string().contains("validation failed"));
        assert!(err.source().is_some());
    }
}
