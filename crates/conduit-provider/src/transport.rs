//! Socket transport abstraction
//!
//! The provider never opens or closes the underlying socket; it consumes a
//! transport that already exists and whose lifecycle is owned elsewhere. All
//! it needs from the seam is a write operation, a connectivity flag, and the
//! shared event stream responses and push notifications arrive on.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Receiver half of the transport's native event stream
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn SocketTransport>;

/// Native notifications pushed by the underlying transport.
///
/// These are the four channels every socket transport exposes; the provider's
/// event bridge translates them into its own outward vocabulary
/// ([`ProviderEvent`](crate::ProviderEvent)).
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A generic inbound message: RPC responses and subscription payloads.
    ///
    /// `meta` is transport framing the socket layer attaches to every
    /// delivery; it is stripped before the payload reaches the dispatcher
    /// and is never observable downstream.
    Message { meta: Value, body: Value },

    /// The transport's account set changed
    AccountsChanged(Vec<String>),

    /// The transport's network identity changed
    NetworkChanged(Value),

    /// The transport reported a failure
    Error(String),
}

/// Transport trait defining the interface the provider builds on
#[async_trait]
pub trait SocketTransport: Send + Sync {
    /// Write one payload, or an array of payloads for a batch.
    ///
    /// Completion of the write says nothing about the response; responses
    /// arrive later on the event stream.
    async fn send(&mut self, body: Value) -> Result<(), TransportError>;

    /// Check the transport's own connectivity flag
    fn is_connected(&self) -> bool;

    /// Hand over the native event stream.
    ///
    /// Called exactly once by [`SocketProvider::start`](crate::SocketProvider::start);
    /// the stream is the single shared channel all responses and
    /// notifications are delivered on.
    async fn start_event_listener(&mut self) -> Result<TransportEventReceiver, TransportError>;
}
