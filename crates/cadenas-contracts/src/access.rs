//! Door events, their outcomes, and the access journal entry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CadenasError;

/// An event reported by the embedded door controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessEvent {
    DoorOpen,
    DoorClose,
}

impl AccessEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessEvent::DoorOpen => "door_open",
            AccessEvent::DoorClose => "door_close",
        }
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessEvent {
    type Err = CadenasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "door_open" => Ok(AccessEvent::DoorOpen),
            "door_close" => Ok(AccessEvent::DoorClose),
            "" => Err(CadenasError::validation("event type required")),
            other => Err(CadenasError::validation(format!(
                "unknown event '{}': expected door_open or door_close",
                other
            ))),
        }
    }
}

/// The outcome class of one access event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Success,
    Failed,
    /// Journaled for audit; no state change and no failure recorded.
    Warning,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Success => "success",
            AccessStatus::Failed => "failed",
            AccessStatus::Warning => "warning",
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable classification attached to an access outcome.
///
/// The first four variants are door-open failures; the rest describe how a
/// door-close was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    NoCodeGenerated,
    CodeIncorrect,
    CodeExpired,
    CodeAlreadyUsedForEntryOrExit,
    /// Close reported with the "no code" placeholder (physical exit button).
    ClosedByButton,
    /// Close matched an entered code and retired it.
    CycleCompleted,
    /// Close matched the current code but no successful open preceded it.
    CloseWithoutEntry,
    /// Close carried a code that is neither current nor a placeholder.
    CodeUnrecognized,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessReason::NoCodeGenerated => "no_code_generated",
            AccessReason::CodeIncorrect => "code_incorrect",
            AccessReason::CodeExpired => "code_expired",
            AccessReason::CodeAlreadyUsedForEntryOrExit => "code_already_used_for_entry_or_exit",
            AccessReason::ClosedByButton => "closed_by_button",
            AccessReason::CycleCompleted => "cycle_completed",
            AccessReason::CloseWithoutEntry => "close_without_entry",
            AccessReason::CodeUnrecognized => "code_unrecognized",
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of one access event. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AccessEvent,
    pub code_used: String,
    pub agent: String,
    pub status: AccessStatus,
    pub reason: Option<AccessReason>,
    pub source_address: String,
}

/// An access event as it arrives from the transport layer, not yet validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessRequest {
    pub event: String,
    pub code: Option<String>,
    pub agent: Option<String>,
    pub source_address: Option<String>,
}

/// What `SubmitAccessEvent` returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessOutcome {
    pub status: AccessStatus,
    pub reason: Option<AccessReason>,
    /// Index of the `multiple_failed_attempts` alert raised by this event, if
    /// the failure threshold tripped. Per-failure alerts are not reported here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_index: Option<u64>,
}
