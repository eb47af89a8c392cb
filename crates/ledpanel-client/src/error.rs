//! Client error type.

use thiserror::Error;

use ledpanel_core::ConfigError;
use ledpanel_protocol::CodecError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or its body not read.
    #[cfg(feature = "tokio-runtime")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered with a non-success status.
    #[error("Device answered with HTTP status {0}")]
    Status(u16),

    #[error("Unexpected response: {0}")]
    Decode(#[from] CodecError),

    #[cfg(feature = "tokio-runtime")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid WebSocket subprotocol: {0}")]
    InvalidProtocol(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
