//! # JSON-RPC Prelude
//!
//! Convenient re-exports of the most commonly used types from the JSON-RPC
//! wire library.
//!
//! ```rust
//! use conduit_jsonrpc::prelude::*;
//! ```

// Core wire types
pub use crate::error::{ErrorObject, ResponseError};
pub use crate::request::{BuildError, PayloadBuilder, Request};
pub use crate::response::validate;
pub use crate::types::{CorrelationId, Version};

// Standard error codes
pub use crate::error_codes::*;
