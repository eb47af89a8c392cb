//! File backed settings storage.
//!
//! Every key is stored as `<dir>/<key>.json`, so the panel settings end up in
//! `~/.ledpanel/settings.json`. An explicit settings file replaces that path
//! for the settings key only.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use ledpanel_core::config::SETTINGS_KEY;
use ledpanel_core::{ConfigError, ConfigStorage};

/// Directory under the home directory that holds the settings.
pub const CONFIG_DIR_NAME: &str = ".ledpanel";

#[derive(Debug, Clone)]
pub struct FileConfigStorage {
    dir: PathBuf,
    settings_file: Option<PathBuf>,
}

impl FileConfigStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            settings_file: None,
        }
    }

    /// Storage in `~/.ledpanel`, or `./.ledpanel` without a home directory.
    pub fn default_location() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(CONFIG_DIR_NAME))
    }

    /// Storage whose settings live in `path` (the `--config` flag).
    pub fn for_file(path: &Path) -> Self {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            dir,
            settings_file: Some(path.to_path_buf()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        match &self.settings_file {
            Some(file) if key == SETTINGS_KEY => file.clone(),
            _ => self.dir.join(format!("{key}.json")),
        }
    }
}

impl ConfigStorage for FileConfigStorage {
    fn load_value<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(ConfigError::ReadError(format!("{}: {}", path.display(), e))),
        };
        serde_json::from_str(&text)
            .map_err(|e| ConfigError::InvalidData(format!("{}: {}", path.display(), e)))
    }

    fn save_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.dir).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        fs::write(self.path_for(key), json).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledpanel_core::{PanelSettings, SectionMode};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(tmp.path().join("nested"));

        assert!(!storage.path_for("settings").exists());
        assert_eq!(storage.load_settings_or_default().unwrap(), PanelSettings::default());
    }

    #[test]
    fn test_save_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(tmp.path().join(CONFIG_DIR_NAME));
        let settings = PanelSettings {
            host: "ledstrip.local".to_string(),
            section_mode: SectionMode::Accordion,
            ..Default::default()
        };

        storage.save_settings(&settings).unwrap();
        assert!(storage.path_for("settings").is_file());
        assert_eq!(storage.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(tmp.path());
        fs::write(storage.path_for("settings"), "{ not json").unwrap();

        assert!(matches!(
            storage.load_settings_or_default(),
            Err(ConfigError::InvalidData(_))
        ));
    }

    #[test]
    fn test_explicit_settings_file() {
        let storage = FileConfigStorage::for_file(Path::new("/etc/ledpanel/strip.json"));
        assert_eq!(storage.dir(), Path::new("/etc/ledpanel"));
        assert_eq!(storage.path_for("settings"), Path::new("/etc/ledpanel/strip.json"));
        assert_eq!(storage.path_for("other"), Path::new("/etc/ledpanel/other.json"));

        let storage = FileConfigStorage::for_file(Path::new("strip.json"));
        assert_eq!(storage.dir(), Path::new("."));
    }

    #[test]
    fn test_explicit_file_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = FileConfigStorage::for_file(&tmp.path().join("strip.json"));
        let settings = PanelSettings {
            host: "10.0.0.9".to_string(),
            ..Default::default()
        };

        storage.save_settings(&settings).unwrap();
        assert!(tmp.path().join("strip.json").is_file());
        assert_eq!(storage.load_settings().unwrap().host, "10.0.0.9");
    }
}
