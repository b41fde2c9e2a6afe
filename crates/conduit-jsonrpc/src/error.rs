use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The structured `error` member of a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Lift a raw `error` value into a structured object without ever failing.
    ///
    /// A conforming object passes `code`, `message` and `data` through
    /// unmodified. Anything else (a bare string, a number) becomes the
    /// message of an otherwise empty object, so the caller still sees what
    /// the server sent.
    pub fn from_value(raw: &Value) -> Self {
        match raw {
            Value::Object(_) => serde_json::from_value(raw.clone()).unwrap_or_else(|_| Self {
                code: 0,
                message: raw.to_string(),
                data: None,
            }),
            Value::String(s) => Self::new(0, s.clone(), None),
            other => Self::new(0, other.to_string(), None),
        }
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Outcome of classifying a raw response that did not carry a usable result.
#[derive(Debug, Clone, Error)]
pub enum ResponseError {
    /// The response carried a non-null `error` member.
    #[error("server returned error: {0}")]
    Rpc(ErrorObject),

    /// The response carried neither `result` nor `error`.
    #[error("response carries neither result nor error: {0}")]
    Malformed(Value),
}
