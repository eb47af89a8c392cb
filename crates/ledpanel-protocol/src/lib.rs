//! # ledpanel-protocol
//!
//! Message types and codec for the LED strip controller's device API.
//!
//! This crate defines the REST payloads (`/all`, `/allvalues`, `/set`) and the
//! WebSocket messages exchanged on `/ws`.

pub mod codec;
pub mod messages;

pub use codec::*;
pub use messages::*;
