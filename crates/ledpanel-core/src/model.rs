//! Field schema types.
//!
//! The device describes each of its settings with a field descriptor:
//! - a unique `name` used as the key everywhere (REST, WebSocket, registry)
//! - a `type` sent as the integer discriminant of [`FieldType`]
//! - optional constraints (`min`, `max`, `step`) and select `options`
//!
//! Values travel as loosely typed JSON. [`FieldValue`] is the typed form the
//! panel works with once the field type is known.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Rgb;

/// Kind of control a field is rendered as.
///
/// Serialized as its integer discriminant, matching the firmware's
/// `fieldtypes` enum. Discriminant 6 is the firmware's "invalid" marker and is
/// rejected like any other unknown value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FieldType {
    Number = 0,
    Boolean = 1,
    Select = 2,
    Color = 3,
    Title = 4,
    Section = 5,
}

impl FieldType {
    /// True for fields that carry a value the user can edit.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            FieldType::Number | FieldType::Boolean | FieldType::Select | FieldType::Color
        )
    }
}

impl TryFrom<u8> for FieldType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FieldType::Number),
            1 => Ok(FieldType::Boolean),
            2 => Ok(FieldType::Select),
            3 => Ok(FieldType::Color),
            4 => Ok(FieldType::Title),
            5 => Ok(FieldType::Section),
            other => Err(format!("invalid field type {other}")),
        }
    }
}

impl From<FieldType> for u8 {
    fn from(value: FieldType) -> Self {
        value as u8
    }
}

/// Schema entry describing one device setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Unique key of the field (e.g., "brightness")
    pub name: String,

    /// Human readable label
    #[serde(default)]
    pub label: String,

    /// Control kind
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Current value as last seen, in whatever JSON shape the device used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,

    /// Option labels for select fields, indexed by value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldDescriptor {
    /// Create a descriptor with no value or constraints.
    pub fn new(name: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            value: None,
            min: None,
            max: None,
            step: None,
            options: None,
        }
    }

    /// Select options, empty for every other field type.
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// The descriptor's current value interpreted for its field type.
    pub fn typed_value(&self) -> Option<FieldValue> {
        self.value
            .as_ref()
            .and_then(|v| FieldValue::from_json(self.field_type, v, self.options()))
    }
}

/// A field value interpreted for its field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Number(i64),
    Boolean(bool),
    /// Index into the field's options
    Select(usize),
    Color(Rgb),
}

fn json_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

impl FieldValue {
    /// Interpret a JSON value for the given field type.
    ///
    /// Accepts every shape the firmware has been seen to emit:
    /// - numbers as JSON numbers or numeric strings
    /// - booleans as `true`/`false`, `0`/`1` or `"on"`/`"off"`
    /// - selects as an index or an option label
    /// - colors as a packed integer, `"r,g,b"` or `"rgb(r,g,b)"`
    ///
    /// Returns `None` for titles, sections and values that do not fit.
    pub fn from_json(field_type: FieldType, value: &Value, options: &[String]) -> Option<Self> {
        match field_type {
            FieldType::Number => json_integer(value).map(FieldValue::Number),
            FieldType::Boolean => match value {
                Value::Bool(b) => Some(FieldValue::Boolean(*b)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "on" | "true" => Some(FieldValue::Boolean(true)),
                    "off" | "false" => Some(FieldValue::Boolean(false)),
                    other => other.parse::<i64>().ok().map(|n| FieldValue::Boolean(n != 0)),
                },
                other => json_integer(other).map(|n| FieldValue::Boolean(n != 0)),
            },
            FieldType::Select => {
                if let Value::String(label) = value {
                    if let Some(index) = options.iter().position(|o| o == label) {
                        return Some(FieldValue::Select(index));
                    }
                }
                let index = usize::try_from(json_integer(value)?).ok()?;
                if options.is_empty() || index < options.len() {
                    Some(FieldValue::Select(index))
                } else {
                    None
                }
            }
            FieldType::Color => match value {
                Value::String(s) => match Rgb::parse(s) {
                    Ok(rgb) => Some(FieldValue::Color(rgb)),
                    Err(_) => s
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .map(|c| FieldValue::Color(Rgb::from_packed(c))),
                },
                other => {
                    let packed = u32::try_from(json_integer(other)?).ok()?;
                    Some(FieldValue::Color(Rgb::from_packed(packed)))
                }
            },
            FieldType::Title | FieldType::Section => None,
        }
    }

    /// JSON form used for WebSocket echoes and stored descriptor values.
    ///
    /// Booleans are sent as `0`/`1` and colors as their packed integer, which
    /// is what the firmware parses.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Number(n) => Value::from(*n),
            FieldValue::Boolean(b) => Value::from(u8::from(*b)),
            FieldValue::Select(i) => Value::from(*i),
            FieldValue::Color(rgb) => Value::from(rgb.packed()),
        }
    }

    /// Text used as the query value of a `/set` request.
    pub fn query_value(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Boolean(b) => u8::from(*b).to_string(),
            FieldValue::Select(i) => i.to_string(),
            FieldValue::Color(rgb) => rgb.packed().to_string(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Select(_) => FieldType::Select,
            FieldValue::Color(_) => FieldType::Color,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Boolean(b) => write!(f, "{}", u8::from(*b)),
            FieldValue::Select(i) => write!(f, "{i}"),
            FieldValue::Color(rgb) => write!(f, "{rgb}"),
        }
    }
}
