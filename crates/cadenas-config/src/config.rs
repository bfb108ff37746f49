//! Configuration schema and loading.
//!
//! Every key is optional; omitted keys take the documented defaults.
//!
//! ```toml
//! data_file = "/var/lib/cadenas/codes.json"
//!
//! [settings]
//! code_length = 6
//! code_validity_seconds = 300
//! max_attempts = 3
//!
//! [retention]
//! max_access_logs = 1000
//! max_alerts = 500
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cadenas_contracts::{
    error::{CadenasError, CadenasResult},
    settings::{Retention, Settings},
};

pub const DEFAULT_DATA_FILE: &str = "codes.json";

pub const ENV_DATA_FILE: &str = "CADENAS_DATA_FILE";
pub const ENV_CODE_LENGTH: &str = "CADENAS_CODE_LENGTH";
pub const ENV_CODE_VALIDITY: &str = "CADENAS_CODE_VALIDITY";
pub const ENV_MAX_ATTEMPTS: &str = "CADENAS_MAX_ATTEMPTS";

/// Fully resolved startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadenasConfig {
    /// Where the state document lives.
    pub data_file: PathBuf,
    /// Settings used to seed a new state document.
    pub settings: Settings,
    pub retention: Retention,
}

impl Default for CadenasConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            settings: Settings::default(),
            retention: Retention::default(),
        }
    }
}

/// On-disk shape. Unknown keys are rejected so typos do not pass silently.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    data_file: Option<PathBuf>,
    #[serde(default)]
    settings: RawSettings,
    #[serde(default)]
    retention: RawRetention,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    code_length: Option<u32>,
    code_validity_seconds: Option<u64>,
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRetention {
    max_access_logs: Option<usize>,
    max_alerts: Option<usize>,
}

impl From<RawConfig> for CadenasConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = CadenasConfig::default();
        Self {
            data_file: raw.data_file.unwrap_or(defaults.data_file),
            settings: Settings {
                code_length: raw.settings.code_length.unwrap_or(defaults.settings.code_length),
                code_validity_seconds: raw
                    .settings
                    .code_validity_seconds
                    .unwrap_or(defaults.settings.code_validity_seconds),
                max_attempts: raw.settings.max_attempts.unwrap_or(defaults.settings.max_attempts),
            },
            retention: Retention {
                max_access_logs: raw
                    .retention
                    .max_access_logs
                    .unwrap_or(defaults.retention.max_access_logs),
                max_alerts: raw.retention.max_alerts.unwrap_or(defaults.retention.max_alerts),
            },
        }
    }
}

impl CadenasConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `CadenasError::ConfigError` if the TOML is malformed, has an
    /// unknown key, or a value of the wrong type.
    pub fn from_toml_str(s: &str) -> CadenasResult<Self> {
        let raw: RawConfig = toml::from_str(s).map_err(|e| CadenasError::ConfigError {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        Ok(raw.into())
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> CadenasResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CadenasError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&contents)
    }

    /// Apply `CADENAS_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`.
    ///
    /// Numeric values that do not parse are ignored with a warning; the value
    /// already in the config stands.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_DATA_FILE).filter(|p| !p.trim().is_empty()) {
            self.data_file = PathBuf::from(path.trim());
        }
        if let Some(v) = parse_override(&lookup, ENV_CODE_LENGTH) {
            self.settings.code_length = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_CODE_VALIDITY) {
            self.settings.code_validity_seconds = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_MAX_ATTEMPTS) {
            self.settings.max_attempts = v;
        }
        self
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring override that is not a non-negative integer");
            None
        }
    }
}
