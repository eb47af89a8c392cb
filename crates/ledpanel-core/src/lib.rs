//! # ledpanel-core
//!
//! Core model and view state for the LED strip control panel.
//!
//! This crate provides:
//! - Field schema types (FieldDescriptor, FieldType, FieldValue)
//! - RGB color packing and parsing
//! - Section grouping and navigation state
//! - The control registry that backs the rendered form
//! - Per-field write debouncing, WebSocket liveness and the status line
//! - Panel settings and the storage trait
//!
//! This crate is intentionally runtime-agnostic and contains no async code.
//! Every timed behaviour takes an explicit `Instant`, so the async layer
//! decides when to wake up and tests can drive the clock by hand.

pub mod color;
pub mod config;
pub mod debounce;
pub mod liveness;
pub mod model;
pub mod registry;
pub mod section;
pub mod state;
pub mod status;

pub use color::{Channel, ColorError, Rgb};
pub use config::{ConfigError, ConfigStorage, PanelSettings};
pub use debounce::Debouncer;
pub use liveness::{LinkState, LivenessMonitor};
pub use model::*;
pub use registry::{ApplyOutcome, Control, ControlRegistry, Edit, RegistryError};
pub use section::{NavigationState, Section, SectionLayout, SectionMode};
pub use state::{PanelState, WriteRequest};
pub use status::StatusLine;
