//! Event bridge: native transport notifications → outward provider events
//!
//! The bridge performs identity translation only. Payloads are forwarded
//! untouched, with one exception: the generic message channel drops the
//! transport-specific framing argument before anything downstream can see it
//! (that happens in the dispatcher, before delivery here).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::debug;

/// Outward event vocabulary of the provider
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// An inbound payload that matched no pending call (push notification)
    Message(Value),
    /// The account set changed
    AccountsChanged(Vec<String>),
    /// The network identity changed
    NetworkChanged(Value),
    /// The transport reported an error
    Error(String),
    /// First network identity seen; fired once per adapter
    Ready(Value),
}

/// Names of the outward channels, used to detach listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    AccountsChanged,
    NetworkChanged,
    Error,
    Ready,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Message => "message",
            EventKind::AccountsChanged => "accountsChanged",
            EventKind::NetworkChanged => "networkChanged",
            EventKind::Error => "error",
            EventKind::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// A registered outward callback.
///
/// Stored behind `Arc` so delivery can clone it out and release the registry
/// lock before invoking; a callback is then free to re-enter the bridge
/// (detach itself, register another listener) without deadlocking.
type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Callbacks for the outward channels
#[derive(Default)]
struct Listeners {
    message: Option<Callback<Value>>,
    accounts_changed: Option<Callback<Vec<String>>>,
    network_changed: Option<Callback<Value>>,
    error: Option<Callback<String>>,
    ready: Option<Callback<Value>>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("message", &self.message.as_ref().map(|_| "function"))
            .field(
                "accounts_changed",
                &self.accounts_changed.as_ref().map(|_| "function"),
            )
            .field(
                "network_changed",
                &self.network_changed.as_ref().map(|_| "function"),
            )
            .field("error", &self.error.as_ref().map(|_| "function"))
            .field("ready", &self.ready.as_ref().map(|_| "function"))
            .finish()
    }
}

/// Registry translating native notifications into outward events.
///
/// Listener registration and removal are channel-level; per-call listeners
/// live in the dispatcher's pending table, not here. The bridge never
/// settles a pending call.
#[derive(Debug, Default)]
pub struct EventBridge {
    listeners: parking_lot::Mutex<Listeners>,
    ready_fired: AtomicBool,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the push-notification callback
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.listeners.lock().message = Some(Arc::new(callback));
    }

    /// Set the account-set change callback
    pub fn on_accounts_changed<F>(&self, callback: F)
    where
        F: Fn(Vec<String>) + Send + Sync + 'static,
    {
        self.listeners.lock().accounts_changed = Some(Arc::new(callback));
    }

    /// Set the network identity change callback
    pub fn on_network_changed<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.listeners.lock().network_changed = Some(Arc::new(callback));
    }

    /// Set the transport error callback
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.listeners.lock().error = Some(Arc::new(callback));
    }

    /// Set the ready callback, fired once with the first network identity
    pub fn on_ready<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.listeners.lock().ready = Some(Arc::new(callback));
    }

    /// Detach one outward channel. Detaching a channel that was never
    /// attached is a no-op, not a fault.
    pub fn detach(&self, kind: EventKind) {
        debug!(channel = %kind, "Detaching event listener");
        let mut listeners = self.listeners.lock();
        match kind {
            EventKind::Message => listeners.message = None,
            EventKind::AccountsChanged => listeners.accounts_changed = None,
            EventKind::NetworkChanged => listeners.network_changed = None,
            EventKind::Error => listeners.error = None,
            EventKind::Ready => listeners.ready = None,
        }
    }

    /// Detach every outward channel
    pub fn detach_all(&self) {
        debug!("Detaching all event listeners");
        *self.listeners.lock() = Listeners::default();
    }

    /// Deliver an event to whichever callback is registered for it.
    ///
    /// The first network-change delivery additionally fires `ready`.
    /// Callbacks are cloned out of the registry and invoked with the lock
    /// released, so a callback may re-enter the bridge (detach itself,
    /// attach a replacement) without deadlocking.
    pub fn deliver(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::Message(payload) => {
                let callback = self.listeners.lock().message.clone();
                if let Some(callback) = callback {
                    callback(payload);
                }
            }
            ProviderEvent::AccountsChanged(accounts) => {
                let callback = self.listeners.lock().accounts_changed.clone();
                if let Some(callback) = callback {
                    callback(accounts);
                }
            }
            ProviderEvent::NetworkChanged(network) => {
                let first = !self.ready_fired.swap(true, Ordering::SeqCst);
                let (network_changed, ready) = {
                    let listeners = self.listeners.lock();
                    (
                        listeners.network_changed.clone(),
                        first.then(|| listeners.ready.clone()).flatten(),
                    )
                };
                if let Some(callback) = network_changed {
                    callback(network.clone());
                }
                if first {
                    debug!(network = %network, "Network identity seen, firing ready");
                    if let Some(callback) = ready {
                        callback(network);
                    }
                }
            }
            ProviderEvent::Error(message) => {
                let callback = self.listeners.lock().error.clone();
                if let Some(callback) = callback {
                    callback(message);
                }
            }
            // Ready is derived, never delivered directly
            ProviderEvent::Ready(_) => {}
        }
    }
}
