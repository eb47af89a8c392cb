//! Protocol message types for the device API.
//!
//! This module defines every payload exchanged with the controller:
//! - REST: `/all` (schema), `/allvalues` (current values), `/set` (write)
//! - WebSocket device → panel: field updates and client status messages
//! - WebSocket panel → device: best-effort echo of a local write
//!
//! Messages are JSON; WebSocket messages travel in text frames.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ledpanel_core::state::WriteRequest;
use ledpanel_core::{FieldDescriptor, FieldValue};

// ============================================================================
// REST payloads
// ============================================================================

/// A `{name, value}` pair, as found in `/allvalues` and WebSocket pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Response of `GET /allvalues`.
///
/// # Example
/// ```json
/// { "values": [ {"name": "power", "value": 1}, {"name": "brightness", "value": 200} ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllValuesResponse {
    #[serde(default)]
    pub values: Vec<FieldUpdate>,
}

impl AllValuesResponse {
    /// Pairs ready for `PanelState::apply_values`.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|u| (u.name.as_str(), &u.value))
    }
}

/// Response of `GET /set`.
///
/// The firmware answers with `{"currentState": {...}}`; some builds add the
/// field `name`. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "currentState", default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<Value>,
}

/// Descriptor dropped while decoding the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedField {
    /// Position in the `/all` array
    pub index: usize,
    pub name: Option<String>,
    pub reason: String,
}

/// Decoded `GET /all` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
    /// Entries with an unknown type or a broken shape
    pub skipped: Vec<SkippedField>,
}

// ============================================================================
// Writes
// ============================================================================

/// A value-set command for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCommand {
    pub name: String,
    pub value: FieldValue,
}

impl SetCommand {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Query parameters for `GET /set`.
    ///
    /// Colors go out as `<name>=<name>&r=..&g=..&b=..`, everything else as
    /// `<name>=<value>`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self.value {
            FieldValue::Color(rgb) => vec![
                (self.name.clone(), self.name.clone()),
                ("r".to_string(), rgb.r.to_string()),
                ("g".to_string(), rgb.g.to_string()),
                ("b".to_string(), rgb.b.to_string()),
            ],
            other => vec![(self.name.clone(), other.query_value())],
        }
    }

    /// `{"<name>": <value>}` echo sent over the WebSocket.
    pub fn echo(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.name.clone(), self.value.to_json());
        Value::Object(map)
    }
}

impl From<WriteRequest> for SetCommand {
    fn from(write: WriteRequest) -> Self {
        Self {
            name: write.name,
            value: write.value,
        }
    }
}

impl From<&SetCommand> for WriteRequest {
    fn from(cmd: &SetCommand) -> Self {
        Self {
            name: cmd.name.clone(),
            value: cmd.value,
        }
    }
}

// ============================================================================
// WebSocket messages (device → panel)
// ============================================================================

/// Connection bookkeeping the firmware broadcasts to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(rename = "Client")]
    pub client: Value,

    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,

    #[serde(rename = "Ping", default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<Value>,

    #[serde(rename = "Pong", default, skip_serializing_if = "Option::is_none")]
    pub pong: Option<Value>,
}

/// Messages that can be received from the device.
///
/// Uses untagged deserialization - the message type is determined by
/// examining which fields are present. Anything that is valid JSON but
/// neither a field update nor client info ends up in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceMessage {
    /// A field changed on the device.
    FieldUpdate(FieldUpdate),

    /// Client connect/status/heartbeat information.
    ClientInfo(ClientInfo),

    /// Unrecognised JSON.
    Other(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledpanel_core::Rgb;
    use serde_json::json;

    #[test]
    fn test_field_update_deserialization() {
        let msg: DeviceMessage =
            serde_json::from_str(r#"{"name":"brightness","value":128}"#).unwrap();
        match msg {
            DeviceMessage::FieldUpdate(update) => {
                assert_eq!(update.name, "brightness");
                assert_eq!(update.value, json!(128));
            }
            _ => panic!("Expected FieldUpdate"),
        }
    }

    #[test]
    fn test_client_info_deserialization() {
        let msg: DeviceMessage =
            serde_json::from_str(r#"{"Client": 2, "Status": "connected", "Ping": 17}"#).unwrap();
        match msg {
            DeviceMessage::ClientInfo(info) => {
                assert_eq!(info.client, json!(2));
                assert_eq!(info.status, Some(json!("connected")));
                assert_eq!(info.ping, Some(json!(17)));
                assert_eq!(info.pong, None);
            }
            _ => panic!("Expected ClientInfo"),
        }
    }

    #[test]
    fn test_unknown_object_is_other() {
        let msg: DeviceMessage = serde_json::from_str(r#"{"uptime": 1234}"#).unwrap();
        assert_eq!(msg, DeviceMessage::Other(json!({"uptime": 1234})));
    }

    #[test]
    fn test_all_values_response() {
        let json = r#"{"values":[{"name":"power","value":"on"},{"name":"effect","value":3}]}"#;
        let resp: AllValuesResponse = serde_json::from_str(json).unwrap();
        let pairs: Vec<(&str, &Value)> = resp.pairs().collect();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("power", &json!("on")));
    }

    #[test]
    fn test_set_response_current_state() {
        let resp: SetResponse =
            serde_json::from_str(r#"{ "currentState" : { "brightness": 80 } }"#).unwrap();
        assert_eq!(resp.current_state, Some(json!({"brightness": 80})));
        assert_eq!(resp.name, None);
    }

    #[test]
    fn test_query_pairs() {
        let cmd = SetCommand::new("brightness", FieldValue::Number(80));
        assert_eq!(
            cmd.query_pairs(),
            vec![("brightness".to_string(), "80".to_string())]
        );

        let cmd = SetCommand::new("solidColor", FieldValue::Color(Rgb::new(255, 16, 0)));
        let pairs = cmd.query_pairs();
        assert_eq!(pairs[0], ("solidColor".to_string(), "solidColor".to_string()));
        assert_eq!(pairs[1], ("r".to_string(), "255".to_string()));
        assert_eq!(pairs[2], ("g".to_string(), "16".to_string()));
        assert_eq!(pairs[3], ("b".to_string(), "0".to_string()));
    }

    #[test]
    fn test_echo_is_valid_json_object() {
        let cmd = SetCommand::new("solidColor", FieldValue::Color(Rgb::new(0, 0, 255)));
        assert_eq!(cmd.echo(), json!({"solidColor": 255}));

        let cmd = SetCommand::new("power", FieldValue::Boolean(false));
        assert_eq!(cmd.echo(), json!({"power": 0}));
    }
}
