//! Engine configuration.
//!
//! Controls which level catalog is played and the pacing of the vault: the
//! simulated analysis delay, the alarm cool-down and the example autotype
//! speed. Read from `vault.json`; every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{Result, VaultError};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "vault.json";

/// Default delay before a classification result is revealed.
const fn default_analyzing_delay_ms() -> u64 {
    1200
}

/// Default time an alarm stays up before the vault locks again.
const fn default_alarm_cooldown_ms() -> u64 {
    2500
}

/// Default characters added per autotype step.
const fn default_autotype_chars_per_step() -> usize {
    3
}

/// Default pause between autotype steps.
const fn default_autotype_interval_ms() -> u64 {
    30
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Path to a level catalog JSON file. The builtin catalog when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Milliseconds between submitting and revealing a result.
    #[serde(default = "default_analyzing_delay_ms")]
    pub analyzing_delay_ms: u64,

    /// Milliseconds an alarm lasts before the vault returns to locked.
    #[serde(default = "default_alarm_cooldown_ms")]
    pub alarm_cooldown_ms: u64,

    /// Characters revealed per step of the example autotype.
    #[serde(default = "default_autotype_chars_per_step")]
    pub autotype_chars_per_step: usize,

    /// Milliseconds between autotype steps.
    #[serde(default = "default_autotype_interval_ms")]
    pub autotype_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            analyzing_delay_ms: default_analyzing_delay_ms(),
            alarm_cooldown_ms: default_alarm_cooldown_ms(),
            autotype_chars_per_step: default_autotype_chars_per_step(),
            autotype_interval_ms: default_autotype_interval_ms(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `vault.json` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration. A relative `catalog`
    /// path is resolved against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::ConfigParseError` if the file cannot be read or is
    /// not valid JSON, and `VaultError::ConfigValidationError` if a value is
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(VaultError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let mut config: Self = serde_json::from_str(&contents)
            .map_err(|e| VaultError::config_parse(path, e.to_string()))?;
        if let (Some(catalog), Some(base)) = (&config.catalog, path.parent()) {
            if catalog.is_relative() {
                config.catalog = Some(base.join(catalog));
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::ConfigValidationError` if `alarmCooldownMs` or
    /// `autotypeCharsPerStep` is zero, or `catalog` is an empty path.
    pub fn validate(&self) -> Result<()> {
        if self.alarm_cooldown_ms == 0 {
            return Err(VaultError::config_validation(
                "alarmCooldownMs must be greater than 0",
                "Set alarmCooldownMs to at least 1 in your vault.json",
            ));
        }

        if self.autotype_chars_per_step == 0 {
            return Err(VaultError::config_validation(
                "autotypeCharsPerStep must be greater than 0",
                "Set autotypeCharsPerStep to at least 1 in your vault.json",
            ));
        }

        if self
            .catalog
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(VaultError::config_validation(
                "catalog path must not be empty",
                "Remove the catalog field to use the builtin levels",
            ));
        }

        Ok(())
    }

    /// Loads the configured catalog, or the builtin one.
    ///
    /// # Errors
    ///
    /// Returns any catalog loading or validation error.
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(path) => Catalog::load_from_file(path),
            None => Catalog::builtin(),
        }
    }

    /// Session pacing derived from this configuration.
    #[must_use]
    pub const fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            analyzing_delay: Duration::from_millis(self.analyzing_delay_ms),
            alarm_cooldown: Duration::from_millis(self.alarm_cooldown_ms),
            autotype_chars_per_step: self.autotype_chars_per_step,
        }
    }

    /// Pause between example autotype steps.
    #[must_use]
    pub const fn autotype_interval(&self) -> Duration {
        Duration::from_millis(self.autotype_interval_ms)
    }
}

/// Pacing values a [`Session`](crate::Session) needs at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Delay before a result is revealed.
    pub analyzing_delay: Duration,
    /// Alarm duration.
    pub alarm_cooldown: Duration,
    /// Characters revealed per autotype step.
    pub autotype_chars_per_step: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        EngineConfig::default().session_settings()
    }
}
