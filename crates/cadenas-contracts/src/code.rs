//! The single outstanding access code and its read-side views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The one access credential the lock currently accepts.
///
/// At most one `Code` exists at a time. Generating a new one replaces the
/// previous record outright; the old value simply becomes unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Code {
    /// Fixed-length string of decimal digits.
    pub value: String,
    pub generated_at: DateTime<Utc>,
    /// `generated_at` plus the applied validity period.
    pub valid_until: DateTime<Utc>,
    /// Set once the code is permanently retired by a completed open/close cycle.
    pub used: bool,
    /// Set once the code has opened the door, pending the matching close.
    pub used_for_entry: bool,
}

/// Where a code sits in its single open/close cycle.
///
/// There is no transition out of `Retired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeState {
    /// Generated, never used.
    Fresh,
    /// Opened the door; waiting for the close.
    Entered,
    /// Full cycle completed.
    Retired,
}

/// Why `GetCurrentCode` is not handing out a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeUnavailable {
    NoCodeGenerated,
    CodeExpired,
    CodeUsed,
}

/// What the door controller receives when it polls for the current code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCode {
    pub valid: bool,
    /// The code value, present only while `valid` is true.
    pub code: Option<String>,
    /// Whole seconds until expiry, never negative.
    pub remaining_seconds: i64,
    /// Present only while `valid` is false.
    pub reason: Option<CodeUnavailable>,
}
