//! Request/response correlation engine
//!
//! One shared event stream, many independently awaited calls. Every dispatched
//! call registers a one-shot listener keyed by its correlation id; the pump
//! task routes each inbound payload to the matching listener by id, never by
//! arrival order. The listener table is the single piece of shared mutable
//! state, and it is mutated in exactly two places: [`PendingCalls::register`]
//! on dispatch and [`PendingCalls::settle`]/[`PendingCalls::remove`] on
//! settlement.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use conduit_jsonrpc::{CorrelationId, validate};

use crate::error::ProviderError;
use crate::events::{EventBridge, ProviderEvent};
use crate::transport::TransportEvent;

/// What a settled call resolves to
pub(crate) type Settlement = Result<Value, ProviderError>;

/// How the aggregate reply for an id should be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    /// Validate the envelope, resolve with the `result` field only
    Single,
    /// Hand back the raw aggregate reply; the caller demultiplexes
    Batch,
}

struct PendingCall {
    kind: CallKind,
    tx: oneshot::Sender<Settlement>,
}

/// The listener table: correlation id → one-shot continuation.
///
/// An entry lives from dispatch until settlement and is removed *before* the
/// continuation runs, so a continuation re-entering the dispatcher can never
/// observe its own stale entry.
#[derive(Default)]
pub(crate) struct PendingCalls {
    inner: parking_lot::Mutex<HashMap<CorrelationId, PendingCall>>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `id` and hand back the receiving half.
    pub(crate) fn register(&self, id: CorrelationId, kind: CallKind) -> oneshot::Receiver<Settlement> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().insert(id, PendingCall { kind, tx });
        rx
    }

    /// Remove the listener for `id`, settling nothing.
    ///
    /// Dropping the sender fails the awaiting future with `ListenerRemoved`;
    /// this is the external cancellation hook. Returns whether a listener
    /// was present.
    pub(crate) fn remove(&self, id: &CorrelationId) -> bool {
        self.inner.lock().remove(id).is_some()
    }

    /// Number of in-flight calls
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Take the listener for `id` out of the table, if any.
    ///
    /// The entry is gone before the caller touches the sender, keeping the
    /// cleanup invariant local to this one method.
    fn take(&self, id: &CorrelationId) -> Option<PendingCall> {
        self.inner.lock().remove(id)
    }

    /// Settle the call registered under `id` with the given body.
    ///
    /// Returns `false` when no listener was registered, i.e. the payload is
    /// a push notification or a stray duplicate.
    fn settle(&self, id: &CorrelationId, body: &Value) -> bool {
        let Some(pending) = self.take(id) else {
            return false;
        };

        let settlement = match pending.kind {
            CallKind::Single => validate(body).map_err(ProviderError::from),
            CallKind::Batch => Ok(body.clone()),
        };

        debug!(%id, ok = settlement.is_ok(), "Settling pending call");
        if pending.tx.send(settlement).is_err() {
            // Caller stopped awaiting; the entry is already gone.
            debug!(%id, "Settlement receiver dropped");
        }
        true
    }
}

/// Route one inbound message body to a pending call or outward.
///
/// A single response correlates on its own id. A batch reply (an array) is
/// registered under one of its payloads' ids, but servers may return the
/// sub-responses in any order, so every element's id is checked against the
/// table until one matches. Anything unmatched is forwarded verbatim as an
/// outward message event.
fn route_message(pending: &PendingCalls, bridge: &EventBridge, body: Value) {
    match &body {
        Value::Array(items) => {
            for id in items.iter().filter_map(CorrelationId::from_response) {
                if pending.settle(&id, &body) {
                    return;
                }
            }
        }
        _ => {
            if let Some(id) = CorrelationId::from_response(&body) {
                if pending.settle(&id, &body) {
                    return;
                }
                debug!(%id, "Inbound payload matched no pending call");
            }
        }
    }

    bridge.deliver(ProviderEvent::Message(body));
}

/// Spawn the pump task draining the transport's native event stream.
///
/// Runs until the transport drops its sender. A native error notification is
/// forwarded outward verbatim; it settles no pending call by itself.
pub(crate) fn spawn_event_loop(
    mut receiver: mpsc::UnboundedReceiver<TransportEvent>,
    pending: Arc<PendingCalls>,
    bridge: Arc<EventBridge>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("Provider event loop started");

        while let Some(event) = receiver.recv().await {
            match event {
                // `meta` is transport framing; dropped here, never observed
                // downstream.
                TransportEvent::Message { meta: _, body } => {
                    route_message(&pending, &bridge, body);
                }
                TransportEvent::AccountsChanged(accounts) => {
                    debug!(count = accounts.len(), "Account set changed");
                    bridge.deliver(ProviderEvent::AccountsChanged(accounts));
                }
                TransportEvent::NetworkChanged(network) => {
                    debug!(%network, "Network identity changed");
                    bridge.deliver(ProviderEvent::NetworkChanged(network));
                }
                TransportEvent::Error(message) => {
                    warn!(error = %message, "Transport reported error");
                    bridge.deliver(ProviderEvent::Error(message));
                }
            }
        }

        info!(
            in_flight = pending.len(),
            "Transport event stream ended, event loop stopped"
        );
    })
}
