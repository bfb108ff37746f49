//! Boundary validation: everything here runs before any state is loaded.

use cadenas_contracts::{
    access::{AccessEvent, AccessRequest},
    alert::NewAlert,
    error::{CadenasError, CadenasResult},
    settings::{Settings, MAX_CODE_LENGTH, MIN_CODE_LENGTH, MIN_CODE_VALIDITY_SECONDS},
};

pub const MAX_SUBMITTED_CODE_CHARS: usize = 32;
pub const MAX_AGENT_CHARS: usize = 128;
pub const UNKNOWN_AGENT: &str = "unknown";
pub const UNKNOWN_SOURCE: &str = "unknown";

/// An access event whose fields have been checked and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAccess {
    pub event: AccessEvent,
    /// Trimmed submitted code. May be empty for a door-close.
    pub code: String,
    pub agent: String,
    pub source_address: String,
}

fn invalid(reason: impl Into<String>) -> CadenasError {
    CadenasError::Validation { reason: reason.into() }
}

pub fn validate_access(request: &AccessRequest) -> CadenasResult<ValidatedAccess> {
    let event: AccessEvent = request.event.parse()?;

    let code = request
        .code
        .as_deref()
        .ok_or_else(|| invalid("code field required"))?
        .trim()
        .to_string();

    if event == AccessEvent::DoorOpen && code.is_empty() {
        return Err(invalid("door_open requires a non-empty code"));
    }
    if code.chars().count() > MAX_SUBMITTED_CODE_CHARS {
        return Err(invalid(format!(
            "code longer than {} characters",
            MAX_SUBMITTED_CODE_CHARS
        )));
    }

    let agent = match request.agent.as_deref().map(str::trim) {
        None | Some("") => UNKNOWN_AGENT.to_string(),
        Some(agent) if agent.chars().count() > MAX_AGENT_CHARS => {
            return Err(invalid(format!("agent longer than {} characters", MAX_AGENT_CHARS)));
        }
        Some(agent) => agent.to_string(),
    };

    let source_address = match request.source_address.as_deref().map(str::trim) {
        None | Some("") => UNKNOWN_SOURCE.to_string(),
        Some(source) => source.to_string(),
    };

    Ok(ValidatedAccess { event, code, agent, source_address })
}

pub fn validate_new_alert(new: NewAlert) -> CadenasResult<NewAlert> {
    let alert_type = new.alert_type.trim();
    if alert_type.is_empty() {
        return Err(invalid("alert type required"));
    }
    Ok(NewAlert { alert_type: alert_type.to_string(), ..new })
}

/// Administrative settings updates are checked strictly; nothing is coerced.
pub fn validate_settings(settings: &Settings) -> CadenasResult<()> {
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&settings.code_length) {
        return Err(invalid(format!(
            "code_length must be between {} and {}, got {}",
            MIN_CODE_LENGTH, MAX_CODE_LENGTH, settings.code_length
        )));
    }
    if settings.code_validity_seconds < MIN_CODE_VALIDITY_SECONDS {
        return Err(invalid(format!(
            "code_validity_seconds must be at least {}, got {}",
            MIN_CODE_VALIDITY_SECONDS, settings.code_validity_seconds
        )));
    }
    if settings.max_attempts == 0 {
        return Err(invalid("max_attempts must be at least 1"));
    }
    Ok(())
}
