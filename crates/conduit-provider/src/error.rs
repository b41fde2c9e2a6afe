//! Error types for provider operations

use serde_json::Value;
use thiserror::Error;

use conduit_jsonrpc::{BuildError, CorrelationId, ErrorObject, ResponseError};

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error surfaced by [`SocketProvider`](crate::SocketProvider) operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The underlying channel failed before or instead of a response
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a structured JSON-RPC error
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// A response arrived but carried neither `result` nor `error`
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Payload construction failed
    #[error("payload error: {0}")]
    Payload(#[from] BuildError),

    /// Serialization failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The pending call's listener was removed before a response matched
    #[error("listener for request {0} was removed before settlement")]
    ListenerRemoved(CorrelationId),

    /// A batch must contain at least one call
    #[error("batch contains no calls")]
    EmptyBatch,
}

impl From<ErrorObject> for ProviderError {
    fn from(err: ErrorObject) -> Self {
        ProviderError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

impl From<ResponseError> for ProviderError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Rpc(obj) => obj.into(),
            ResponseError::Malformed(raw) => ProviderError::InvalidResponse(raw.to_string()),
        }
    }
}

/// Transport-specific errors
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("write failed: {0}")]
    Write(String),

    #[error("transport is not connected")]
    NotConnected,

    #[error("transport closed unexpectedly")]
    Closed,
}

impl ProviderError {
    /// Get the JSON-RPC error code if the server rejected the call
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            ProviderError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check if the error came from the transport rather than the server
    pub fn is_transport_error(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}
