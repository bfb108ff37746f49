//! Rules for the single "current code" record.
//!
//! The record lives in `StateDocument::current_code`; these functions are the
//! only place it is created or judged valid.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use cadenas_contracts::{
    code::{Code, CodeState, CodeUnavailable, CurrentCode},
    settings::{Settings, MIN_CODE_VALIDITY_SECONDS},
};

use crate::{generator::normalize_code_length, traits::CodeGenerator};

/// Upper bound on the applied validity period (one year).
pub const MAX_APPLIED_VALIDITY_SECONDS: u64 = 365 * 24 * 60 * 60;

/// The validity period actually applied, never shorter than one minute.
pub fn applied_validity(settings: &Settings) -> Duration {
    let seconds = settings
        .code_validity_seconds
        .clamp(MIN_CODE_VALIDITY_SECONDS, MAX_APPLIED_VALIDITY_SECONDS);
    Duration::seconds(seconds as i64)
}

/// Create a fresh code and install it in `slot`, replacing whatever was there.
///
/// The previous code, valid or not, is not revoked; it simply becomes
/// unreachable.
pub fn generate_new(
    slot: &mut Option<Code>,
    settings: &Settings,
    generator: &dyn CodeGenerator,
    now: DateTime<Utc>,
) -> Code {
    let length = normalize_code_length(i64::from(settings.code_length));
    let code = Code {
        value: generator.generate(length),
        generated_at: now,
        valid_until: now + applied_validity(settings),
        used: false,
        used_for_entry: false,
    };

    info!(
        code = %mask_code(&code.value),
        valid_until = %code.valid_until,
        replaced = slot.is_some(),
        "new access code generated"
    );

    *slot = Some(code.clone());
    code
}

/// True iff the code has not expired and has not been retired.
///
/// A code that has opened the door but not yet been closed is still valid.
pub fn is_valid(code: &Code, now: DateTime<Utc>) -> bool {
    code.valid_until > now && !code.used
}

pub fn is_expired(code: &Code, now: DateTime<Utc>) -> bool {
    code.valid_until <= now
}

pub fn state(code: &Code) -> CodeState {
    if code.used {
        CodeState::Retired
    } else if code.used_for_entry {
        CodeState::Entered
    } else {
        CodeState::Fresh
    }
}

/// Whole seconds left before expiry, floored at zero.
pub fn remaining_seconds(code: &Code, now: DateTime<Utc>) -> i64 {
    (code.valid_until - now).num_seconds().max(0)
}

/// Build the polling view handed to the door controller.
pub fn current_view(code: Option<&Code>, now: DateTime<Utc>) -> CurrentCode {
    let Some(code) = code else {
        return CurrentCode {
            valid: false,
            code: None,
            remaining_seconds: 0,
            reason: Some(CodeUnavailable::NoCodeGenerated),
        };
    };

    let remaining = remaining_seconds(code, now);
    if is_valid(code, now) {
        CurrentCode {
            valid: true,
            code: Some(code.value.clone()),
            remaining_seconds: remaining,
            reason: None,
        }
    } else {
        // Expiry is reported ahead of retirement.
        let reason = if is_expired(code, now) {
            CodeUnavailable::CodeExpired
        } else {
            CodeUnavailable::CodeUsed
        };
        CurrentCode {
            valid: false,
            code: None,
            remaining_seconds: remaining,
            reason: Some(reason),
        }
    }
}

/// Keep the first two characters and star out the rest, for log output.
pub fn mask_code(value: &str) -> String {
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < 2 { c } else { '*' })
        .collect()
}
