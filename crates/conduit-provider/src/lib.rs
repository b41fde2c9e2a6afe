//! # Conduit socket provider
//!
//! A future-based JSON-RPC calling convention over transports that are only
//! reachable through an asynchronous, event-emitting interface: responses
//! arrive on a shared event stream rather than as return values, and the
//! transport pushes out-of-band chain-state notifications on the same stream.
//!
//! The core is the correlation machinery in [`SocketProvider`]: every call
//! registers a one-shot listener keyed by its payload's correlation id, a
//! single pump task routes incoming events to the matching listener, and the
//! listener is removed on every settlement path — success, protocol error,
//! transport error, or external cancellation.
//!
//! ```no_run
//! # use conduit_provider::{SocketProvider, BoxedTransport};
//! # async fn example(transport: BoxedTransport) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = SocketProvider::new(transport);
//! provider.start().await?;
//!
//! let block = provider.call("eth_blockNumber", vec![]).await?;
//! println!("head: {}", block);
//! # Ok(())
//! # }
//! ```
//!
//! The transport's lifecycle is externally owned: this crate never connects,
//! reconnects or tears down the underlying socket. [`SocketProvider::disconnect`]
//! only detaches outward listeners and always reports success.
//!
//! No timeout exists at this layer. A call whose response never arrives stays
//! pending; callers guard with their own timeout and cancel via
//! [`SocketProvider::remove_listener`].

pub mod batch;
pub(crate) mod dispatch;
pub mod error;
pub mod events;
pub mod provider;
pub mod transport;

pub mod prelude;

// Re-export main types
pub use batch::{BatchCall, BeforeExecution};
pub use error::{ProviderError, ProviderResult, TransportError};
pub use events::{EventBridge, EventKind, ProviderEvent};
pub use provider::{ListenerKey, SocketProvider};
pub use transport::{BoxedTransport, SocketTransport, TransportEvent, TransportEventReceiver};

// Re-export the wire types callers need to speak to us
pub use conduit_jsonrpc::{CorrelationId, ErrorObject, Request};
