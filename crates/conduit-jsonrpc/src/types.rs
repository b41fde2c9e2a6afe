use std::fmt;

use serde::{Deserialize, Serialize};

/// Value correlating a request with its eventual response.
///
/// Either a number or a string, never null. Numbers are what
/// [`PayloadBuilder`](crate::PayloadBuilder) hands out; the string form exists
/// because servers are allowed to echo ids verbatim and some peers mint their
/// own. Hashable so it can key the provider's listener table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationId {
    Number(u64),
    String(String),
}

impl CorrelationId {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CorrelationId::Number(n) => Some(*n),
            CorrelationId::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CorrelationId::String(s) => Some(s),
            CorrelationId::Number(_) => None,
        }
    }

    /// Extract a correlation id from the `id` field of a raw JSON value.
    ///
    /// Returns `None` when the field is absent, null, or of a shape this
    /// adapter never produces (floats, objects).
    pub fn from_response(raw: &serde_json::Value) -> Option<Self> {
        match raw.get("id")? {
            serde_json::Value::Number(n) => n.as_u64().map(CorrelationId::Number),
            serde_json::Value::String(s) => Some(CorrelationId::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationId::Number(n) => write!(f, "{}", n),
            CorrelationId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for CorrelationId {
    fn from(n: u64) -> Self {
        CorrelationId::Number(n)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        CorrelationId::String(s.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        CorrelationId::String(s)
    }
}

/// The `jsonrpc` field, always the literal `"2.0"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version;

impl Version {
    pub fn as_str(&self) -> &'static str {
        crate::JSONRPC_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == crate::JSONRPC_VERSION {
            Ok(Version)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported JSON-RPC version: {}",
                s
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn correlation_id_serializes_untagged() {
        assert_eq!(
            serde_json::to_string(&CorrelationId::Number(7)).unwrap(),
            "7"
        );
        assert_eq!(
            serde_json::to_string(&CorrelationId::from("abc")).unwrap(),
            r#""abc""#
        );
    }

    #[test]
    fn correlation_id_from_response() {
        assert_eq!(
            CorrelationId::from_response(&json!({"id": 42, "result": null})),
            Some(CorrelationId::Number(42))
        );
        assert_eq!(
            CorrelationId::from_response(&json!({"id": "req-1"})),
            Some(CorrelationId::String("req-1".to_string()))
        );
        assert_eq!(CorrelationId::from_response(&json!({"id": null})), None);
        assert_eq!(CorrelationId::from_response(&json!({"result": 1})), None);
        assert_eq!(CorrelationId::from_response(&json!({"id": 1.5})), None);
    }

    #[test]
    fn version_round_trip() {
        assert_eq!(serde_json::to_string(&Version).unwrap(), r#""2.0""#);
        assert!(serde_json::from_str::<Version>(r#""2.0""#).is_ok());
        assert!(serde_json::from_str::<Version>(r#""1.0""#).is_err());
    }
}
