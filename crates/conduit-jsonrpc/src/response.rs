use serde_json::Value;

use crate::error::{ErrorObject, ResponseError};

/// Classify a raw response as a result or a structured error.
///
/// Total over any JSON value, including shapes a conforming server would
/// never send:
///
/// - a non-null `error` member always wins, even when `result` is also
///   present;
/// - a present `result` (including `null`) with no error is success;
/// - a response carrying neither is [`ResponseError::Malformed`], never a
///   silent `null` success.
///
/// `message` and `data` of a structured error pass through unmodified.
pub fn validate(response: &Value) -> Result<Value, ResponseError> {
    if let Some(error) = response.get("error") {
        if !error.is_null() {
            return Err(ResponseError::Rpc(ErrorObject::from_value(error)));
        }
    }

    match response.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(ResponseError::Malformed(response.clone())),
    }
}
