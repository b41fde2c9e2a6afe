use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{CorrelationId, Version};

/// A JSON-RPC request payload.
///
/// Params are always positional; this adapter treats method names and
/// parameters as opaque and only guarantees the envelope shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: Version,
    pub id: CorrelationId,
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(id: CorrelationId, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: Version,
            id,
            method: method.into(),
            params,
        }
    }
}

/// Error building a request payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("method name must not be empty")]
    EmptyMethod,
}

/// Mints request payloads with fresh correlation ids.
///
/// Ids come from a single atomic counter, so they are monotonically distinct
/// for the lifetime of the builder and never reused while a request is still
/// outstanding. Sharing one builder per provider is what makes concurrent
/// calls safe to correlate.
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    next_id: AtomicU64,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request for `method` with positional `params`.
    ///
    /// `params` may be empty; an empty `method` is rejected.
    pub fn build(&self, method: &str, params: Vec<Value>) -> Result<Request, BuildError> {
        if method.is_empty() {
            return Err(BuildError::EmptyMethod);
        }
        let id = CorrelationId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(Request::new(id, method, params))
    }
}
