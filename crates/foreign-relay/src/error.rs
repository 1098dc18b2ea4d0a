//! Relay error types.

use crate::RelayResponse;
use relay_ipc::IpcError;
use relay_storage::StorageError;
use thiserror::Error;

/// Failure of a relayed call.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The message never produced a usable reply
    #[error("Transport error: {0}")]
    Transport(#[from] IpcError),

    /// The background process answered with `error: true`
    #[error("{message}")]
    Remote {
        message: String,
        response: Option<RelayResponse>,
    },

    /// The response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RelayError {
    /// The reconstructed HTTP response, if the remote side attached one.
    pub fn response(&self) -> Option<&RelayResponse> {
        match self {
            RelayError::Remote { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    /// HTTP status of the attached response.
    pub fn status(&self) -> Option<u16> {
        self.response().map(RelayResponse::status)
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors from a durable cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Errors reading the resolved identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Neither a fetch nor the cache produced user details
    #[error("User details are unavailable")]
    Unavailable,

    /// User details were resolved but lack the field
    #[error("User details have no {0}")]
    MissingField(&'static str),
}
