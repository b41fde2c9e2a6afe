//! # Provider Prelude
//!
//! Convenient re-exports of the most commonly used types from the provider
//! library.
//!
//! ```rust
//! use conduit_provider::prelude::*;
//! ```

// Core provider types
pub use crate::batch::{BatchCall, BeforeExecution};
pub use crate::error::{ProviderError, ProviderResult, TransportError};
pub use crate::events::{EventBridge, EventKind, ProviderEvent};
pub use crate::provider::{ListenerKey, SocketProvider};

// Transport seam
pub use crate::transport::{BoxedTransport, SocketTransport, TransportEvent};

// Wire types
pub use conduit_jsonrpc::{CorrelationId, ErrorObject, PayloadBuilder, Request};
