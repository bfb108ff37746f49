//! Process-wide lock settings and journal retention limits.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CODE_LENGTH: u32 = 4;
pub const MIN_CODE_LENGTH: u32 = 4;
pub const MAX_CODE_LENGTH: u32 = 10;
pub const DEFAULT_CODE_VALIDITY_SECONDS: u64 = 300;
/// Validity periods shorter than this are raised to it when a code is generated.
pub const MIN_CODE_VALIDITY_SECONDS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Settings persisted inside the state document.
///
/// Values are stored as given; the floors and fallbacks are applied at the
/// point of use (code generation, failure tracking).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub code_length: u32,
    pub code_validity_seconds: u64,
    pub max_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            code_validity_seconds: DEFAULT_CODE_VALIDITY_SECONDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A partial settings update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default)]
    pub code_length: Option<u32>,
    #[serde(default)]
    pub code_validity_seconds: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl SettingsPatch {
    pub fn apply_to(&self, base: &Settings) -> Settings {
        Settings {
            code_length: self.code_length.unwrap_or(base.code_length),
            code_validity_seconds: self.code_validity_seconds.unwrap_or(base.code_validity_seconds),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
        }
    }
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            code_length: Some(settings.code_length),
            code_validity_seconds: Some(settings.code_validity_seconds),
            max_attempts: Some(settings.max_attempts),
        }
    }
}

/// Maximum number of entries each journal keeps. Oldest entries go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retention {
    pub max_access_logs: usize,
    pub max_alerts: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            max_access_logs: 1000,
            max_alerts: 500,
        }
    }
}
