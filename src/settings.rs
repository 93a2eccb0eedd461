use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{StorageError, default_data_file};
use crate::validation::validate_days;

pub const DEFAULT_HISTORY_DAYS: usize = 30;
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ledger data file. `None` uses the platform data directory.
    pub data_file: Option<PathBuf>,
    /// Days shown by the history table and written by the export.
    pub history_days: usize,
    /// Period of the background history reconciliation while serving.
    pub reconcile_interval_secs: u64,
    pub enable_stdio: bool,
    pub enable_http: bool,
    pub http_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: None,
            history_days: DEFAULT_HISTORY_DAYS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            enable_stdio: true,
            enable_http: false,
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
        }
    }
}

pub fn settings_path() -> Result<PathBuf, SettingsError> {
    let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(base.join("habit-ledger").join("settings.json"))
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn resolve_data_file(&self) -> Result<PathBuf, StorageError> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => default_data_file(),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.enable_stdio && !self.enable_http {
            return Err(SettingsError::Invalid(
                "enable at least one transport (stdio or http)".to_string(),
            ));
        }
        if self.enable_http {
            self.http_addr.parse::<SocketAddr>().map_err(|e| {
                SettingsError::Invalid(format!("invalid http_addr '{}': {e}", self.http_addr))
            })?;
        }
        if self.reconcile_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "reconcile_interval_secs must be at least 1".to_string(),
            ));
        }
        validate_days(self.history_days)
            .map_err(|e| SettingsError::Invalid(format!("history_days: {e}")))?;
        Ok(())
    }

    /// Walk through every field with terminal prompts.
    pub fn edit_interactively(&self) -> Result<Self, SettingsError> {
        let theme = ColorfulTheme::default();
        let data_file_default = self
            .data_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let data_file: String = Input::with_theme(&theme)
            .with_prompt("Data file (empty for the default location)")
            .default(data_file_default)
            .allow_empty(true)
            .interact_text()?;
        let history_days: usize = Input::with_theme(&theme)
            .with_prompt("Days of history to show and export")
            .default(self.history_days)
            .interact_text()?;
        let reconcile_interval_secs: u64 = Input::with_theme(&theme)
            .with_prompt("History reconciliation interval (seconds)")
            .default(self.reconcile_interval_secs)
            .interact_text()?;
        let enable_stdio = Confirm::with_theme(&theme)
            .with_prompt("Serve MCP over stdio?")
            .default(self.enable_stdio)
            .interact()?;
        let enable_http = Confirm::with_theme(&theme)
            .with_prompt("Serve MCP over streamable HTTP?")
            .default(self.enable_http)
            .interact()?;
        let http_addr: String = Input::with_theme(&theme)
            .with_prompt("HTTP bind address")
            .default(self.http_addr.clone())
            .interact_text()?;

        let edited = Self {
            data_file: (!data_file.trim().is_empty()).then(|| PathBuf::from(data_file.trim())),
            history_days,
            reconcile_interval_secs,
            enable_stdio,
            enable_http,
            http_addr,
        };
        edited.validate()?;
        Ok(edited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"history_days": 14}"#).unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.history_days, 14);
        assert_eq!(settings.reconcile_interval_secs, 300);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");
        let settings = Settings {
            data_file: Some(dir.path().join("habits.json")),
            enable_http: true,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn garbage_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let no_transport = Settings {
            enable_stdio: false,
            enable_http: false,
            ..Settings::default()
        };
        assert!(no_transport.validate().is_err());

        let bad_addr = Settings {
            enable_http: true,
            http_addr: "nowhere".into(),
            ..Settings::default()
        };
        assert!(bad_addr.validate().is_err());

        let zero_interval = Settings {
            reconcile_interval_secs: 0,
            ..Settings::default()
        };
        assert!(zero_interval.validate().is_err());

        let zero_days = Settings {
            history_days: 0,
            ..Settings::default()
        };
        assert!(zero_days.validate().is_err());

        let huge_days = Settings {
            history_days: 1_000_000,
            ..Settings::default()
        };
        assert!(matches!(huge_days.validate(), Err(SettingsError::Invalid(m)) if m.contains("3660")));
    }
}
