//! # JSON-RPC 2.0 wire types
//!
//! Pure, transport-agnostic JSON-RPC 2.0 request/response handling. This crate
//! owns the three leaf concerns of the provider stack and nothing else:
//!
//! - building request payloads with fresh correlation ids ([`PayloadBuilder`])
//! - classifying raw responses as result or structured error ([`validate`])
//! - the wire shapes themselves ([`Request`], [`ErrorObject`], [`CorrelationId`])
//!
//! Everything here is synchronous and total: malformed input is classified,
//! never panicked on. Transport and correlation machinery live in
//! `conduit-provider`.

pub mod error;
pub mod request;
pub mod response;
pub mod types;

pub mod prelude;

// Re-export main types
pub use error::{ErrorObject, ResponseError};
pub use request::{BuildError, PayloadBuilder, Request};
pub use response::validate;
pub use types::{CorrelationId, Version};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
