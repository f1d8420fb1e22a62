//! TOML-based application configuration.
//!
//! Stores the session defaults the CLI and ticker fall back to.
//! Configuration is stored at `~/.config/habitflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Session-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Target length used when a start request names no duration.
    #[serde(default = "default_focus_minutes")]
    pub default_focus_minutes: u32,
    /// Coalescing interval for persisted progress updates.
    #[serde(default = "default_progress_flush_secs")]
    pub progress_flush_secs: u64,
    /// Ticker period for foreground sessions.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habitflow/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_progress_flush_secs() -> u64 {
    15
}
fn default_tick_interval_secs() -> u64 {
    1
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_focus_minutes: default_focus_minutes(),
            progress_flush_secs: default_progress_flush_secs(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, falling back to defaults when no file exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                Ok(cfg)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Persist to disk as TOML.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Read a value by dotted path, e.g. `session.default_focus_minutes`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let root = serde_json::to_value(self).ok()?;
        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?.clone();
        }
        Some(current)
    }

    /// Set a value by dotted path, parsing `value` against the existing
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut root = serde_json::to_value(&*self)?;
        set_json_value_by_path(&mut root, key, value)?;
        *self = serde_json::from_value(root).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn set_json_value_by_path(
    root: &mut serde_json::Value,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    let mut parts = key.split('.').peekable();
    if parts.peek().is_none() {
        return Err(unknown());
    }

    let mut current = root;
    while let Some(part) = parts.next() {
        let is_leaf = parts.peek().is_none();
        if is_leaf {
            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|e| invalid(e.to_string()))?;
                    serde_json::Value::Number(n.into())
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        current = current.get_mut(part).ok_or_else(unknown)?;
    }

    Err(unknown())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.session.default_focus_minutes, 25);
        assert_eq!(cfg.session.progress_flush_secs, 15);
        assert_eq!(cfg.session.tick_interval_secs, 1);
    }

    #[test]
    fn toml_round_trip_with_missing_fields() {
        let cfg: Config = toml::from_str("[session]\ndefault_focus_minutes = 45\n").unwrap();
        assert_eq!(cfg.session.default_focus_minutes, 45);
        // Unspecified fields fall back to defaults.
        assert_eq!(cfg.session.progress_flush_secs, 15);
    }

    #[test]
    fn get_and_set_by_dotted_path() {
        let mut cfg = Config::default();
        cfg.set("session.default_focus_minutes", "50").unwrap();
        assert_eq!(cfg.session.default_focus_minutes, 50);
        assert_eq!(
            cfg.get("session.default_focus_minutes"),
            Some(serde_json::json!(50))
        );

        assert!(cfg.set("session.unknown_field", "1").is_err());
        assert!(cfg.set("nonsense", "1").is_err());
        assert!(cfg.get("session.unknown_field").is_none());
    }

    #[test]
    fn set_rejects_unparsable_numbers() {
        let mut cfg = Config::default();
        let err = cfg
            .set("session.default_focus_minutes", "soon")
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
