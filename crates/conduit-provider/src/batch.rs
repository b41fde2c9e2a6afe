//! Batch dispatch: many calls, one transport write
//!
//! A batch is an atomic transport-level unit. The dispatcher runs each call's
//! pre-send hook, builds the ordered payload array and writes it in one
//! operation; the raw aggregate reply goes back to the caller, who owns
//! per-item correlation and validation.

use std::fmt;

use serde_json::Value;

use conduit_jsonrpc::{PayloadBuilder, Request};

use crate::error::{ProviderError, ProviderResult};

/// Hook run against a call immediately before its payload is built.
///
/// Runs exactly once, in queue order, and may mutate the call's method and
/// params in place.
pub type BeforeExecution = Box<dyn FnOnce(&mut BatchCall) + Send>;

/// One queued call of a batch
pub struct BatchCall {
    pub method: String,
    pub params: Vec<Value>,
    pub before_execution: Option<BeforeExecution>,
}

impl BatchCall {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            before_execution: None,
        }
    }

    /// Attach a pre-send hook
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut BatchCall) + Send + 'static,
    {
        self.before_execution = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for BatchCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchCall")
            .field("method", &self.method)
            .field("params", &self.params)
            .field(
                "before_execution",
                &self.before_execution.as_ref().map(|_| "hook"),
            )
            .finish()
    }
}

/// Run hooks and build the ordered payload sequence for one batch.
///
/// Payload order matches queue order; ids come from the shared builder so
/// they stay unique against concurrent single calls.
pub(crate) fn build_batch(
    builder: &PayloadBuilder,
    mut calls: Vec<BatchCall>,
) -> ProviderResult<Vec<Request>> {
    if calls.is_empty() {
        return Err(ProviderError::EmptyBatch);
    }

    let mut payloads = Vec::with_capacity(calls.len());
    for call in &mut calls {
        if let Some(hook) = call.before_execution.take() {
            hook(call);
        }
        let params = std::mem::take(&mut call.params);
        payloads.push(builder.build(&call.method, params)?);
    }
    Ok(payloads)
}
