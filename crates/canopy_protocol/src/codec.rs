//! JSON body codec.

use crate::error::ProtocolResult;
use serde_json::Value;

/// Encodes a value as a JSON body.
pub fn encode_value(value: &Value) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decodes a JSON body. An empty body decodes to `Value::Null`.
pub fn decode_value(bytes: &[u8]) -> ProtocolResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}
