//! JSON codec for the device protocol.
//!
//! The firmware builds its JSON by hand, so decoding is lenient where the
//! panel can still make progress: a schema entry with an unknown type is
//! skipped rather than failing the whole load, and an unparseable `/set`
//! reply is treated as an empty one.

use serde_json::Value;
use thiserror::Error;

use ledpanel_core::FieldDescriptor;

use crate::messages::{
    AllValuesResponse, DeviceMessage, Schema, SetCommand, SetResponse, SkippedField,
};

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON (de)serialization failed.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `/all` did not return an array.
    #[error("Expected a JSON array of fields")]
    NotAnArray,
}

/// Decode a `GET /all` body.
pub fn decode_schema(text: &str) -> Result<Schema, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    decode_schema_value(value)
}

/// Decode an already parsed `GET /all` body.
pub fn decode_schema_value(value: Value) -> Result<Schema, CodecError> {
    let Value::Array(entries) = value else {
        return Err(CodecError::NotAnArray);
    };

    let mut schema = Schema::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry.get("name").and_then(Value::as_str).map(String::from);
        match serde_json::from_value::<FieldDescriptor>(entry) {
            Ok(field) => schema.fields.push(field),
            Err(e) => schema.skipped.push(SkippedField {
                index,
                name,
                reason: e.to_string(),
            }),
        }
    }
    Ok(schema)
}

/// Decode a `GET /allvalues` body.
pub fn decode_all_values(text: &str) -> Result<AllValuesResponse, CodecError> {
    serde_json::from_str(text).map_err(CodecError::from)
}

/// Decode a `GET /set` body. Empty or malformed bodies yield an empty response.
pub fn decode_set_response(text: &str) -> SetResponse {
    serde_json::from_str(text).unwrap_or_default()
}

/// Decode a message received over the WebSocket.
pub fn decode_device_message(text: &str) -> Result<DeviceMessage, CodecError> {
    serde_json::from_str(text).map_err(CodecError::from)
}

/// Encode the WebSocket echo of a write.
pub fn encode_echo(cmd: &SetCommand) -> Result<String, CodecError> {
    serde_json::to_string(&cmd.echo()).map_err(CodecError::from)
}

/// Check if a message appears to be a field update.
///
/// This is useful for quick message type detection without full parsing.
pub fn is_field_update(text: &str) -> bool {
    text.contains("\"name\"")
}
