//! The socket provider facade

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, info, warn};

use conduit_jsonrpc::{CorrelationId, PayloadBuilder};

use crate::batch::{BatchCall, build_batch};
use crate::dispatch::{CallKind, PendingCalls, spawn_event_loop};
use crate::error::{ProviderError, ProviderResult};
use crate::events::{EventBridge, EventKind};
use crate::transport::BoxedTransport;

/// What [`SocketProvider::remove_listener`] addresses: either one outward
/// event channel or one in-flight call.
#[derive(Debug, Clone)]
pub enum ListenerKey {
    Event(EventKind),
    Call(CorrelationId),
}

impl From<EventKind> for ListenerKey {
    fn from(kind: EventKind) -> Self {
        ListenerKey::Event(kind)
    }
}

impl From<CorrelationId> for ListenerKey {
    fn from(id: CorrelationId) -> Self {
        ListenerKey::Call(id)
    }
}

/// JSON-RPC provider over an event-emitting socket transport.
///
/// Exposes a future-based calling convention on top of a transport whose
/// responses arrive on a shared event stream. One provider serves many
/// concurrent calls; responses are matched strictly by correlation id, so
/// out-of-order delivery never misroutes a result.
pub struct SocketProvider {
    /// Transport layer, lifecycle owned externally
    transport: Arc<tokio::sync::Mutex<BoxedTransport>>,
    /// Listener table for in-flight calls
    pending: Arc<PendingCalls>,
    /// Outward event channels
    bridge: Arc<EventBridge>,
    /// Correlation id source shared by single calls and batches
    payloads: PayloadBuilder,
    /// Pump task handle, present once started
    pump: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
    /// Guards against double-subscribing the event stream
    started: AtomicBool,
}

impl SocketProvider {
    /// Create a provider over an existing transport.
    ///
    /// The provider is not listening yet; call [`start`](Self::start) before
    /// dispatching.
    pub fn new(transport: BoxedTransport) -> Self {
        Self {
            transport: Arc::new(tokio::sync::Mutex::new(transport)),
            pending: Arc::new(PendingCalls::new()),
            bridge: Arc::new(EventBridge::new()),
            payloads: PayloadBuilder::new(),
            pump: parking_lot::Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Attach to the transport's event stream and start routing.
    ///
    /// Idempotent: a second call is a no-op and never re-subscribes.
    pub async fn start(&self) -> ProviderResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Provider already listening");
            return Ok(());
        }

        let receiver = {
            let mut transport = self.transport.lock().await;
            match transport.start_event_listener().await {
                Ok(receiver) => receiver,
                Err(e) => {
                    self.started.store(false, Ordering::SeqCst);
                    return Err(e.into());
                }
            }
        };

        let handle = spawn_event_loop(
            receiver,
            Arc::clone(&self.pending),
            Arc::clone(&self.bridge),
        );
        *self.pump.lock() = Some(handle);

        info!("Provider listening on transport event stream");
        Ok(())
    }

    /// Dispatch one call and await its result.
    ///
    /// Builds the payload, registers a one-shot listener under its
    /// correlation id, writes to the transport, and resolves with the
    /// response's `result` field only — never the envelope. The listener is
    /// removed on every settlement path: a matched response, a write
    /// failure, and external cancellation alike.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> ProviderResult<Value> {
        let request = self.payloads.build(method, params)?;
        let body = serde_json::to_value(&request)?;
        let id = request.id;

        debug!(%id, method = method, "Dispatching call");
        let rx = self.pending.register(id.clone(), CallKind::Single);

        if let Err(e) = self.transport.lock().await.send(body).await {
            self.pending.remove(&id);
            warn!(%id, error = %e, "Transport write failed");
            return Err(e.into());
        }

        match rx.await {
            Ok(settlement) => settlement,
            Err(_) => Err(ProviderError::ListenerRemoved(id)),
        }
    }

    /// Send a batch of calls as one transport write.
    ///
    /// Each call's pre-send hook runs exactly once, in order, immediately
    /// before its payload is built. Resolves with the raw aggregate reply,
    /// matched whichever order the server returned the sub-responses in;
    /// per-item validation and demultiplexing belong to the caller.
    pub async fn send_batch(&self, calls: Vec<BatchCall>) -> ProviderResult<Value> {
        let payloads = build_batch(&self.payloads, calls)?;
        let first_id = payloads[0].id.clone();
        let body = serde_json::to_value(&payloads)?;

        debug!(%first_id, count = payloads.len(), "Dispatching batch");
        let rx = self.pending.register(first_id.clone(), CallKind::Batch);

        if let Err(e) = self.transport.lock().await.send(body).await {
            self.pending.remove(&first_id);
            warn!(%first_id, error = %e, "Batch write failed");
            return Err(e.into());
        }

        match rx.await {
            Ok(settlement) => settlement,
            Err(_) => Err(ProviderError::ListenerRemoved(first_id)),
        }
    }

    /// Detach the provider's outward listeners.
    ///
    /// Always reports success: the transport's lifecycle is owned
    /// externally, so there is nothing else to tear down here. Deliberate
    /// policy, not an omission.
    pub fn disconnect(&self) -> bool {
        debug!("Disconnect requested, detaching outward listeners");
        self.bridge.detach_all();
        true
    }

    /// The transport's own connectivity flag
    pub async fn connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Access the outward event channels for listener registration
    pub fn events(&self) -> &EventBridge {
        &self.bridge
    }

    /// Remove one listener: an outward event channel or an in-flight call.
    ///
    /// Removing a call's listener cancels it externally — the awaiting
    /// future fails with [`ProviderError::ListenerRemoved`]. Removing
    /// something never registered is a no-op.
    pub fn remove_listener(&self, key: impl Into<ListenerKey>) {
        match key.into() {
            ListenerKey::Event(kind) => self.bridge.detach(kind),
            ListenerKey::Call(id) => {
                if self.pending.remove(&id) {
                    debug!(%id, "Removed listener for in-flight call");
                }
            }
        }
    }

    /// Detach every outward event channel
    pub fn remove_all_listeners(&self) {
        self.bridge.detach_all();
    }

    /// Number of calls awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Whether the pump task has been started
    pub fn is_listening(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

impl Drop for SocketProvider {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}
