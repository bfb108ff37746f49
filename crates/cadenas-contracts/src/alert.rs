//! Security alerts and their resolution state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CadenasError;

/// Alert type raised when the failure window reaches `max_attempts`.
pub const MULTIPLE_FAILED_ATTEMPTS: &str = "multiple_failed_attempts";

/// Alert type raised for every denied door-open.
pub const FAILED_ATTEMPT: &str = "failed_attempt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CadenasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(CadenasError::validation(format!(
                "unknown severity '{}': expected low, medium, high or critical",
                other
            ))),
        }
    }
}

/// Who raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    /// Raised by the failure tracker.
    Automatic,
    /// Raised through `CreateAlert`.
    Manual,
}

/// A security notification.
///
/// `index` is assigned from a counter that never goes backwards, so it stays
/// valid after older alerts are trimmed away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Alert {
    pub index: u64,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    pub severity: Severity,
    pub source: AlertSource,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

/// The fields a caller supplies when raising an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlert {
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Returned by `CreateAlert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReceipt {
    pub alert_index: u64,
    pub timestamp: DateTime<Utc>,
}

/// Returned by `ResolveAlert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReceipt {
    pub alert_index: u64,
    pub resolved_at: DateTime<Utc>,
}
