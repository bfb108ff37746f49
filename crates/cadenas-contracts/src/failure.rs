//! The rolling window of failed door-open attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One failed open attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailedAttempt {
    pub timestamp: DateTime<Utc>,
    pub source_address: String,
    pub client_identifier: String,
}

/// Failed attempts newer than the window length, oldest first.
///
/// After every pruning pass `count == attempts.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureWindow {
    pub count: u32,
    pub attempts: Vec<FailedAttempt>,
}
