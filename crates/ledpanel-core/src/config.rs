//! Panel configuration and its storage abstraction.
//!
//! Storage is a trait so the settings logic stays independent of where the
//! file lives. The client crate provides a file backed implementation.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::section::SectionMode;

/// Errors that can occur during configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested configuration was not found.
    NotFound(String),
    /// Failed to read configuration.
    ReadError(String),
    /// Failed to write configuration.
    WriteError(String),
    /// Configuration data is invalid.
    InvalidData(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Configuration not found: {}", key),
            ConfigError::ReadError(msg) => write!(f, "Read error: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Write error: {}", msg),
            ConfigError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Abstract configuration storage.
pub trait ConfigStorage: Send + Sync {
    /// Load a value by key.
    fn load_value<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError>;

    /// Save a value by key.
    fn save_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError>;

    /// Load panel settings.
    fn load_settings(&self) -> Result<PanelSettings, ConfigError> {
        self.load_value(SETTINGS_KEY)
    }

    /// Save panel settings.
    fn save_settings(&self, settings: &PanelSettings) -> Result<(), ConfigError> {
        self.save_value(SETTINGS_KEY, settings)
    }

    /// Load panel settings, falling back to defaults when none were saved.
    fn load_settings_or_default(&self) -> Result<PanelSettings, ConfigError> {
        match self.load_settings() {
            Err(ConfigError::NotFound(_)) => Ok(PanelSettings::default()),
            other => other,
        }
    }
}

/// Storage key of the panel settings.
pub const SETTINGS_KEY: &str = "settings";

/// Connection and behaviour settings for the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelSettings {
    /// Device host name or address (the soft-AP address by default).
    pub host: String,

    /// Base URL of the REST endpoints, `http://<host>` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_base: Option<String>,

    /// WebSocket path on the device.
    pub ws_path: String,

    /// WebSocket subprotocol the firmware expects.
    pub ws_protocol: String,

    /// Quiet period before a slider or picker edit is written.
    pub write_delay_ms: u64,

    /// How long transient status messages stay visible.
    pub status_timeout_ms: u64,

    /// Per request timeout for REST calls.
    pub request_timeout_ms: u64,

    /// First reconnect delay after the socket drops.
    pub reconnect_interval_ms: u64,

    /// Upper bound of the reconnect backoff.
    pub max_reconnect_interval_ms: u64,

    pub section_mode: SectionMode,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            host: "192.168.4.1".to_string(),
            http_base: None,
            ws_path: "/ws".to_string(),
            ws_protocol: "arduino".to_string(),
            write_delay_ms: 300,
            status_timeout_ms: 4000,
            request_timeout_ms: 5000,
            reconnect_interval_ms: 1000,
            max_reconnect_interval_ms: 30_000,
            section_mode: SectionMode::Navigation,
        }
    }
}

impl PanelSettings {
    /// Base URL for REST calls, without a trailing slash.
    pub fn http_base(&self) -> String {
        match &self.http_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.host),
        }
    }

    /// WebSocket URL, e.g. `ws://192.168.4.1/ws`.
    pub fn ws_url(&self) -> String {
        let path = if self.ws_path.starts_with('/') {
            self.ws_path.clone()
        } else {
            format!("/{}", self.ws_path)
        };
        format!("ws://{}{}", self.host, path)
    }

    pub fn write_delay(&self) -> Duration {
        Duration::from_millis(self.write_delay_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn max_reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// In-memory storage for testing.
    struct MemoryConfigStorage {
        data: RwLock<HashMap<String, String>>,
    }

    impl MemoryConfigStorage {
        fn new() -> Self {
            Self {
                data: RwLock::new(HashMap::new()),
            }
        }
    }

    impl ConfigStorage for MemoryConfigStorage {
        fn load_value<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
            let data = self.data.read().unwrap();
            let json = data
                .get(key)
                .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidData(e.to_string()))
        }

        fn save_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
            let json =
                serde_json::to_string(value).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            self.data.write().unwrap().insert(key.to_string(), json);
            Ok(())
        }
    }

    #[test]
    fn test_settings_round_trip() {
        let storage = MemoryConfigStorage::new();

        let settings = PanelSettings {
            host: "ledstrip.local".to_string(),
            write_delay_ms: 150,
            section_mode: SectionMode::Accordion,
            ..Default::default()
        };

        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_missing_settings_fall_back_to_defaults() {
        let storage = MemoryConfigStorage::new();
        assert!(matches!(storage.load_settings(), Err(ConfigError::NotFound(_))));
        assert_eq!(storage.load_settings_or_default().unwrap(), PanelSettings::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: PanelSettings =
            serde_json::from_str(r#"{"host": "10.0.0.7", "sectionMode": "accordion"}"#).unwrap();

        assert_eq!(settings.host, "10.0.0.7");
        assert_eq!(settings.section_mode, SectionMode::Accordion);
        assert_eq!(settings.ws_protocol, "arduino");
        assert_eq!(settings.write_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_urls() {
        let mut settings = PanelSettings {
            host: "10.0.0.7".to_string(),
            ws_path: "ws".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.http_base(), "http://10.0.0.7");
        assert_eq!(settings.ws_url(), "ws://10.0.0.7/ws");

        settings.http_base = Some("http://127.0.0.1:8080/".to_string());
        assert_eq!(settings.http_base(), "http://127.0.0.1:8080");
    }
}
