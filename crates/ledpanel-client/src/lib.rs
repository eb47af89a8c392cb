//! # ledpanel-client
//!
//! Device client for the LED strip control panel.
//!
//! Enable features based on target platform:
//! - `tokio-runtime` (default) - REST loader, live WebSocket sync and the
//!   write dispatcher on tokio
//!
//! The settings file storage is always available.

pub mod error;
pub mod storage;

#[cfg(feature = "tokio-runtime")]
pub mod dispatch;
#[cfg(feature = "tokio-runtime")]
pub mod http;
#[cfg(feature = "tokio-runtime")]
pub mod live;
#[cfg(feature = "tokio-runtime")]
pub mod session;

pub use error::ClientError;
pub use storage::FileConfigStorage;

#[cfg(feature = "tokio-runtime")]
pub use dispatch::{WriteDispatcher, WriteOutcome};
#[cfg(feature = "tokio-runtime")]
pub use http::DeviceApi;
#[cfg(feature = "tokio-runtime")]
pub use live::{Backoff, EchoSender, LiveConfig, LiveEvent, LiveHandle};
#[cfg(feature = "tokio-runtime")]
pub use session::{apply_device_message, load_state, Session, SessionEvent};

pub use ledpanel_core::{PanelSettings, PanelState};
pub use ledpanel_protocol::{DeviceMessage, SetCommand};
