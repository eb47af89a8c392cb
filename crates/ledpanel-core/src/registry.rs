//! Control registry backing the rendered form.
//!
//! Each field in the schema gets one control handle, keyed by field name.
//! A control holds the single value all of its widgets display: the slider
//! and numeric input of a number field, or the picker, text boxes and
//! sliders of a color field, are views of the same value and cannot drift
//! apart.
//!
//! There are two ways to change a value:
//! - local edits (`set_number`, `toggle`, `select_next`, ...) return an
//!   [`Edit`] that must be written to the device
//! - [`ControlRegistry::apply_remote`] stores a value that came from the
//!   device and never produces an edit, so a push can not echo back out

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::color::{Channel, Rgb};
use crate::model::{FieldDescriptor, FieldType, FieldValue};

/// Range used when a number field omits `min`/`max`.
pub const DEFAULT_NUMBER_MIN: i64 = 0;
pub const DEFAULT_NUMBER_MAX: i64 = 255;

/// Errors for local edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field {name} is a {actual:?} field, not {expected:?}")]
    WrongKind {
        name: String,
        expected: FieldType,
        actual: FieldType,
    },

    #[error("Select field {0} has no options")]
    NoOptions(String),
}

/// A local change that has to be sent to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub name: String,
    pub value: FieldValue,
    /// Slider and picker drags are coalesced before writing; toggles and
    /// select changes go out immediately.
    pub debounced: bool,
}

/// Result of applying a device value to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// No control with that name
    UnknownField,
    /// Titles and sections carry no value
    Ignored,
    /// The value could not be interpreted for the field's type
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberControl {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub value: i64,
}

impl NumberControl {
    /// Clamp into range and snap onto the step grid starting at `min`.
    ///
    /// Works in `i128` so ranges spanning most of `i64` cannot overflow.
    pub fn normalize(&self, value: i64) -> i64 {
        let min = i128::from(self.min);
        let max = i128::from(self.max);
        let step = i128::from(self.step.max(1));

        let offset = i128::from(value.clamp(self.min, self.max)) - min;
        let mut snapped = min + ((offset + step / 2) / step) * step;
        if snapped > max {
            snapped -= step;
        }
        i64::try_from(snapped).unwrap_or(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanControl {
    pub on: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectControl {
    pub options: Vec<String>,
    pub selected: usize,
}

impl SelectControl {
    pub fn selected_label(&self) -> Option<&str> {
        self.options.get(self.selected).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorControl {
    pub rgb: Rgb,
}

/// Widget state for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Number(NumberControl),
    Boolean(BooleanControl),
    Select(SelectControl),
    Color(ColorControl),
    Title,
    Section,
}

impl Control {
    pub fn field_type(&self) -> FieldType {
        match self {
            Control::Number(_) => FieldType::Number,
            Control::Boolean(_) => FieldType::Boolean,
            Control::Select(_) => FieldType::Select,
            Control::Color(_) => FieldType::Color,
            Control::Title => FieldType::Title,
            Control::Section => FieldType::Section,
        }
    }

    /// The value the control currently displays.
    pub fn value(&self) -> Option<FieldValue> {
        match self {
            Control::Number(c) => Some(FieldValue::Number(c.value)),
            Control::Boolean(c) => Some(FieldValue::Boolean(c.on)),
            Control::Select(c) => Some(FieldValue::Select(c.selected)),
            Control::Color(c) => Some(FieldValue::Color(c.rgb)),
            Control::Title | Control::Section => None,
        }
    }

    fn options(&self) -> &[String] {
        match self {
            Control::Select(c) => &c.options,
            _ => &[],
        }
    }

    /// Store a value without producing an edit. Mismatched kinds are ignored.
    fn store(&mut self, value: FieldValue) -> bool {
        match (self, value) {
            (Control::Number(c), FieldValue::Number(v)) => c.value = v,
            (Control::Boolean(c), FieldValue::Boolean(v)) => c.on = v,
            (Control::Select(c), FieldValue::Select(v)) => {
                if !c.options.is_empty() && v >= c.options.len() {
                    return false;
                }
                c.selected = v;
            }
            (Control::Color(c), FieldValue::Color(v)) => c.rgb = v,
            _ => return false,
        }
        true
    }
}

/// A registered control and the label it is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlHandle {
    pub name: String,
    pub label: String,
    pub control: Control,
}

impl ControlHandle {
    fn from_descriptor(field: &FieldDescriptor) -> Self {
        let typed = field.typed_value();
        let control = match field.field_type {
            FieldType::Number => {
                let min = field.min.unwrap_or(DEFAULT_NUMBER_MIN);
                let max = field.max.unwrap_or(DEFAULT_NUMBER_MAX).max(min);
                let step = field.step.filter(|s| *s > 0).unwrap_or(1);
                let value = match typed {
                    Some(FieldValue::Number(v)) => v,
                    _ => min,
                };
                Control::Number(NumberControl {
                    min,
                    max,
                    step,
                    value: value.clamp(min, max),
                })
            }
            FieldType::Boolean => Control::Boolean(BooleanControl {
                on: matches!(typed, Some(FieldValue::Boolean(true))),
            }),
            FieldType::Select => Control::Select(SelectControl {
                options: field.options().to_vec(),
                selected: match typed {
                    Some(FieldValue::Select(i)) => i,
                    _ => 0,
                },
            }),
            FieldType::Color => Control::Color(ColorControl {
                rgb: match typed {
                    Some(FieldValue::Color(rgb)) => rgb,
                    _ => Rgb::from_packed(0),
                },
            }),
            FieldType::Title => Control::Title,
            FieldType::Section => Control::Section,
        };

        Self {
            name: field.name.clone(),
            label: field.label.clone(),
            control,
        }
    }
}

/// Field-name keyed controls in schema order.
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    order: Vec<String>,
    controls: HashMap<String, ControlHandle>,
}

impl ControlRegistry {
    /// Create one control per descriptor. Later duplicates of a name are skipped.
    pub fn build(fields: &[FieldDescriptor]) -> Self {
        let mut registry = ControlRegistry::default();
        for field in fields {
            if registry.controls.contains_key(&field.name) {
                continue;
            }
            registry.order.push(field.name.clone());
            registry
                .controls
                .insert(field.name.clone(), ControlHandle::from_descriptor(field));
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ControlHandle> {
        self.controls.get(name)
    }

    /// Handles in schema order.
    pub fn iter(&self) -> impl Iterator<Item = &ControlHandle> {
        self.order.iter().filter_map(|name| self.controls.get(name))
    }

    pub fn value(&self, name: &str) -> Option<FieldValue> {
        self.get(name).and_then(|h| h.control.value())
    }

    /// Show a value received from the device.
    pub fn apply_remote(&mut self, name: &str, value: &Value) -> ApplyOutcome {
        let Some(handle) = self.controls.get_mut(name) else {
            return ApplyOutcome::UnknownField;
        };
        let field_type = handle.control.field_type();
        if !field_type.is_editable() {
            return ApplyOutcome::Ignored;
        }
        let Some(typed) = FieldValue::from_json(field_type, value, handle.control.options())
        else {
            return ApplyOutcome::Invalid;
        };
        self.apply_value(name, typed)
    }

    /// Show an already typed value received from the device.
    pub fn apply_value(&mut self, name: &str, value: FieldValue) -> ApplyOutcome {
        match self.controls.get_mut(name) {
            None => ApplyOutcome::UnknownField,
            Some(handle) if !handle.control.field_type().is_editable() => ApplyOutcome::Ignored,
            Some(handle) => {
                let value = match (&handle.control, value) {
                    (Control::Number(c), FieldValue::Number(v)) => {
                        FieldValue::Number(v.clamp(c.min, c.max))
                    }
                    (_, v) => v,
                };
                if handle.control.store(value) {
                    ApplyOutcome::Applied
                } else {
                    ApplyOutcome::Invalid
                }
            }
        }
    }

    fn control_mut(&mut self, name: &str) -> Result<&mut Control, RegistryError> {
        self.controls
            .get_mut(name)
            .map(|handle| &mut handle.control)
            .ok_or_else(|| RegistryError::UnknownField(name.to_string()))
    }

    fn wrong_kind(name: &str, expected: FieldType, actual: &Control) -> RegistryError {
        RegistryError::WrongKind {
            name: name.to_string(),
            expected,
            actual: actual.field_type(),
        }
    }

    /// Slider or numeric input change.
    pub fn set_number(&mut self, name: &str, value: i64) -> Result<Edit, RegistryError> {
        match self.control_mut(name)? {
            Control::Number(c) => {
                c.value = c.normalize(value);
                Ok(Edit {
                    name: name.to_string(),
                    value: FieldValue::Number(c.value),
                    debounced: true,
                })
            }
            other => Err(Self::wrong_kind(name, FieldType::Number, other)),
        }
    }

    /// Move a number by whole steps.
    pub fn nudge_number(&mut self, name: &str, steps: i64) -> Result<Edit, RegistryError> {
        let target = match self.control_mut(name)? {
            Control::Number(c) => c.value.saturating_add(steps.saturating_mul(c.step)),
            other => return Err(Self::wrong_kind(name, FieldType::Number, other)),
        };
        self.set_number(name, target)
    }

    pub fn set_boolean(&mut self, name: &str, on: bool) -> Result<Edit, RegistryError> {
        match self.control_mut(name)? {
            Control::Boolean(c) => {
                c.on = on;
                Ok(Edit {
                    name: name.to_string(),
                    value: FieldValue::Boolean(on),
                    debounced: false,
                })
            }
            other => Err(Self::wrong_kind(name, FieldType::Boolean, other)),
        }
    }

    pub fn toggle(&mut self, name: &str) -> Result<Edit, RegistryError> {
        let on = match self.control_mut(name)? {
            Control::Boolean(c) => c.on,
            other => return Err(Self::wrong_kind(name, FieldType::Boolean, other)),
        };
        self.set_boolean(name, !on)
    }

    fn select_control(&mut self, name: &str) -> Result<&mut SelectControl, RegistryError> {
        match self.control_mut(name)? {
            Control::Select(c) if c.options.is_empty() => {
                Err(RegistryError::NoOptions(name.to_string()))
            }
            Control::Select(c) => Ok(c),
            other => Err(Self::wrong_kind(name, FieldType::Select, other)),
        }
    }

    fn select_edit(name: &str, selected: usize) -> Edit {
        Edit {
            name: name.to_string(),
            value: FieldValue::Select(selected),
            debounced: false,
        }
    }

    /// Dropdown change. Out of range indices clamp to the last option.
    pub fn select_index(&mut self, name: &str, index: usize) -> Result<Edit, RegistryError> {
        let c = self.select_control(name)?;
        c.selected = index.min(c.options.len() - 1);
        Ok(Self::select_edit(name, c.selected))
    }

    /// "Next" stepper, wrapping from the last option to the first.
    pub fn select_next(&mut self, name: &str) -> Result<Edit, RegistryError> {
        let c = self.select_control(name)?;
        c.selected = if c.selected + 1 >= c.options.len() {
            0
        } else {
            c.selected + 1
        };
        Ok(Self::select_edit(name, c.selected))
    }

    /// "Previous" stepper, wrapping from the first option to the last.
    pub fn select_previous(&mut self, name: &str) -> Result<Edit, RegistryError> {
        let c = self.select_control(name)?;
        c.selected = if c.selected == 0 || c.selected >= c.options.len() {
            c.options.len() - 1
        } else {
            c.selected - 1
        };
        Ok(Self::select_edit(name, c.selected))
    }

    /// Picker change.
    pub fn set_color(&mut self, name: &str, rgb: Rgb) -> Result<Edit, RegistryError> {
        match self.control_mut(name)? {
            Control::Color(c) => {
                c.rgb = rgb;
                Ok(Edit {
                    name: name.to_string(),
                    value: FieldValue::Color(rgb),
                    debounced: true,
                })
            }
            other => Err(Self::wrong_kind(name, FieldType::Color, other)),
        }
    }

    /// Change of one R/G/B text box or slider.
    pub fn set_color_channel(
        &mut self,
        name: &str,
        channel: Channel,
        value: u8,
    ) -> Result<Edit, RegistryError> {
        let current = match self.control_mut(name)? {
            Control::Color(c) => c.rgb,
            other => return Err(Self::wrong_kind(name, FieldType::Color, other)),
        };
        self.set_color(name, current.with_channel(channel, value))
    }
}
