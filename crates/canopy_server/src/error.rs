//! Error types for the store server.

use canopy_protocol::{status, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Path or body could not be interpreted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Body exceeds the configured limit.
    #[error("payload too large: {size} bytes exceeds {limit}")]
    PayloadTooLarge {
        /// Body size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Value nests deeper than allowed.
    #[error("value too deep: {depth} levels exceeds {limit}")]
    TooDeep {
        /// Nesting depth of the value below its path.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl ServerError {
    /// Status code the error is reported with.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::Protocol(_) | ServerError::TooDeep { .. } => status::BAD_REQUEST,
            ServerError::PayloadTooLarge { .. } => status::PAYLOAD_TOO_LARGE,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}
