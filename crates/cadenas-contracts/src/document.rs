//! The single persisted state document.
//!
//! Every operation loads this document, mutates it in memory, and writes it
//! back as a whole. Stores persist it verbatim as JSON.

use serde::{Deserialize, Serialize};

use crate::{
    access::AccessLogEntry,
    alert::Alert,
    code::Code,
    error::{CadenasError, CadenasResult},
    failure::FailureWindow,
    settings::Settings,
};

/// Current on-disk layout version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDocument {
    pub version: u32,
    pub settings: Settings,
    pub current_code: Option<Code>,
    /// Append order (oldest first).
    pub access_logs: Vec<AccessLogEntry>,
    /// Append order (oldest first).
    pub alerts: Vec<Alert>,
    pub failed_attempts: FailureWindow,
    /// Index the next alert will receive. Never reused.
    pub next_alert_index: u64,
}

impl StateDocument {
    /// A fresh document with no code, empty journals, and the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            settings,
            current_code: None,
            access_logs: Vec::new(),
            alerts: Vec::new(),
            failed_attempts: FailureWindow::default(),
            next_alert_index: 0,
        }
    }

    /// Structural checks serde cannot express.
    ///
    /// Returns `StorageCorruption` on an unsupported version, a failure window
    /// whose count disagrees with its attempts, or an alert counter that would
    /// hand out an index already in use.
    pub fn check_integrity(&self) -> CadenasResult<()> {
        if self.version != DOCUMENT_VERSION {
            return Err(CadenasError::StorageCorruption {
                reason: format!(
                    "unsupported document version {} (expected {})",
                    self.version, DOCUMENT_VERSION
                ),
            });
        }

        if self.failed_attempts.count as usize != self.failed_attempts.attempts.len() {
            return Err(CadenasError::StorageCorruption {
                reason: format!(
                    "failure window count {} does not match {} recorded attempts",
                    self.failed_attempts.count,
                    self.failed_attempts.attempts.len()
                ),
            });
        }

        if let Some(max_index) = self.alerts.iter().map(|a| a.index).max() {
            if max_index >= self.next_alert_index {
                return Err(CadenasError::StorageCorruption {
                    reason: format!(
                        "alert index {} is not below next_alert_index {}",
                        max_index, self.next_alert_index
                    ),
                });
            }
        }

        if let Some(code) = &self.current_code {
            if code.value.is_empty() || !code.value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CadenasError::StorageCorruption {
                    reason: "current code is not a digit string".to_string(),
                });
            }
        }

        Ok(())
    }
}
