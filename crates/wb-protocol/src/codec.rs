//! Text frame encoding and decoding

use serde_json::Value;

use crate::error::ProtocolError;
use crate::message::Request;

/// Encode a request as a JSON text frame
pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(request)?)
}

/// Decode an inbound text frame
///
/// Only JSON objects are accepted; anything else is a protocol error the
/// caller is expected to drop.
pub fn decode_frame(text: &str) -> Result<Value, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject);
    }
    Ok(value)
}

/// The `id` field of a decoded frame, if it is a non-empty string
pub fn correlation_id(frame: &Value) -> Option<&str> {
    frame
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}
