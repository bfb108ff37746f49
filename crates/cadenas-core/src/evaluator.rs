//! The access-event state machine.
//!
//! A code moves through one cycle only:
//!
//!   FRESH ──door_open──▶ ENTERED ──door_close──▶ RETIRED
//!
//! `handle_open` and `handle_close` decide the outcome of a single event and
//! apply the transition to the code. `evaluate` wraps them with the side
//! effects every event carries: exactly one access journal entry, and for
//! failed opens, a `failed_attempt` alert plus a failure-window update that
//! may escalate to `multiple_failed_attempts`.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use cadenas_contracts::{
    access::{AccessEvent, AccessLogEntry, AccessOutcome, AccessReason, AccessStatus},
    alert::{AlertSource, NewAlert, Severity, FAILED_ATTEMPT},
    code::Code,
    document::StateDocument,
};

use crate::{code_store, failure, journal, request::ValidatedAccess};

/// Close placeholder sent when the door was shut with the physical button.
///
/// Matching is case-insensitive. An empty code means the same thing. Either
/// form bypasses all code matching and always succeeds.
pub const NO_CODE_PLACEHOLDER: &str = "NO_CODE";

/// Status and reason for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: AccessStatus,
    pub reason: Option<AccessReason>,
}

impl Decision {
    fn success(reason: Option<AccessReason>) -> Self {
        Self { status: AccessStatus::Success, reason }
    }

    fn failed(reason: AccessReason) -> Self {
        Self { status: AccessStatus::Failed, reason: Some(reason) }
    }

    fn warning(reason: AccessReason) -> Self {
        Self { status: AccessStatus::Warning, reason: Some(reason) }
    }

    /// Wrong and expired codes count toward the failure window. Missing or
    /// already-used codes do not.
    pub fn counts_as_failed_attempt(&self) -> bool {
        matches!(
            self.reason,
            Some(AccessReason::CodeIncorrect | AccessReason::CodeExpired)
        ) && self.status == AccessStatus::Failed
    }
}

pub fn is_no_code_placeholder(submitted: &str) -> bool {
    let submitted = submitted.trim();
    submitted.is_empty() || submitted.eq_ignore_ascii_case(NO_CODE_PLACEHOLDER)
}

/// Decide a door-open and, on success, move the code from FRESH to ENTERED.
///
/// Checks run in a fixed order: presence, value match, expiry, prior use.
/// The submitted value has to match before any other property of the stored
/// code is considered.
pub fn handle_open(code: Option<&mut Code>, submitted: &str, now: DateTime<Utc>) -> Decision {
    let Some(code) = code else {
        return Decision::failed(AccessReason::NoCodeGenerated);
    };

    if submitted != code.value {
        return Decision::failed(AccessReason::CodeIncorrect);
    }

    if code_store::is_expired(code, now) {
        return Decision::failed(AccessReason::CodeExpired);
    }

    if code.used || code.used_for_entry {
        return Decision::failed(AccessReason::CodeAlreadyUsedForEntryOrExit);
    }

    code.used_for_entry = true;
    Decision::success(None)
}

/// Decide a door-close and, when it completes a cycle, retire the code.
///
/// Closes never fail; anything unexpected is a `Warning` kept for audit.
pub fn handle_close(code: Option<&mut Code>, submitted: &str) -> Decision {
    if is_no_code_placeholder(submitted) {
        return Decision::success(Some(AccessReason::ClosedByButton));
    }

    match code {
        Some(code) if submitted == code.value && code.used_for_entry => {
            code.used = true;
            code.used_for_entry = false;
            Decision::success(Some(AccessReason::CycleCompleted))
        }
        Some(code) if submitted == code.value => Decision::warning(AccessReason::CloseWithoutEntry),
        _ => Decision::warning(AccessReason::CodeUnrecognized),
    }
}

/// Apply one validated access event to the document.
pub fn evaluate(doc: &mut StateDocument, access: &ValidatedAccess, now: DateTime<Utc>) -> AccessOutcome {
    let decision = match access.event {
        AccessEvent::DoorOpen => handle_open(doc.current_code.as_mut(), &access.code, now),
        AccessEvent::DoorClose => handle_close(doc.current_code.as_mut(), &access.code),
    };

    log_decision(access, &decision);

    journal::append_access(
        doc,
        AccessLogEntry {
            timestamp: now,
            event: access.event,
            code_used: access.code.clone(),
            agent: access.agent.clone(),
            status: decision.status,
            reason: decision.reason,
            source_address: access.source_address.clone(),
        },
    );

    if access.event == AccessEvent::DoorOpen && decision.status == AccessStatus::Failed {
        journal::raise_alert(doc, failed_attempt_alert(access, &decision), AlertSource::Automatic, now);
    }

    let mut alert_index = None;
    if decision.counts_as_failed_attempt() {
        let settings = doc.settings.clone();
        let tally = failure::record_failure(
            &mut doc.failed_attempts,
            &access.source_address,
            &access.agent,
            &settings,
            now,
        );
        if let Some(breach) = tally.breach {
            let receipt = journal::raise_alert(doc, breach, AlertSource::Automatic, now);
            alert_index = Some(receipt.alert_index);
        }
    }

    AccessOutcome {
        status: decision.status,
        reason: decision.reason,
        alert_index,
    }
}

/// One medium alert per denied open. The submitted code is masked.
fn failed_attempt_alert(access: &ValidatedAccess, decision: &Decision) -> NewAlert {
    let reason = decision.reason.map(|r| r.as_str()).unwrap_or("none");
    NewAlert {
        alert_type: FAILED_ATTEMPT.to_string(),
        message: format!(
            "failed door_open with code {} ({}) from {}",
            code_store::mask_code(&access.code),
            reason,
            access.source_address
        ),
        severity: Some(Severity::Medium),
    }
}

fn log_decision(access: &ValidatedAccess, decision: &Decision) {
    let reason = decision.reason.map(|r| r.as_str()).unwrap_or("none");
    let code = code_store::mask_code(&access.code);
    match decision.status {
        AccessStatus::Success => info!(
            event = %access.event,
            agent = %access.agent,
            source = %access.source_address,
            code = %code,
            reason,
            "access granted"
        ),
        AccessStatus::Failed => warn!(
            event = %access.event,
            agent = %access.agent,
            source = %access.source_address,
            code = %code,
            reason,
            "access denied"
        ),
        AccessStatus::Warning => warn!(
            event = %access.event,
            agent = %access.agent,
            source = %access.source_address,
            code = %code,
            reason,
            "close reported without a matching cycle"
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use cadenas_contracts::{
        alert::MULTIPLE_FAILED_ATTEMPTS,
        code::CodeState,
        settings::Settings,
    };

    use super::*;
    use crate::code_store::state;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 14, 6, 30, 0).unwrap()
    }

    fn fresh() -> Code {
        Code {
            value: "4821".to_string(),
            generated_at: t0(),
            valid_until: t0() + Duration::seconds(300),
            used: false,
            used_for_entry: false,
        }
    }

    fn in_state(target: CodeState) -> Code {
        let mut code = fresh();
        match target {
            CodeState::Fresh => {}
            CodeState::Entered => code.used_for_entry = true,
            CodeState::Retired => code.used = true,
        }
        code
    }

    fn access(event: AccessEvent, code: &str) -> ValidatedAccess {
        ValidatedAccess {
            event,
            code: code.to_string(),
            agent: "controller".to_string(),
            source_address: "10.0.0.5".to_string(),
        }
    }

    fn doc_with(code: Option<Code>) -> StateDocument {
        let mut doc = StateDocument::new(Settings::default());
        doc.current_code = code;
        doc
    }

    // ── handle_open ──────────────────────────────────────────────────────────

    #[test]
    fn test_open_without_any_code_fails() {
        let decision = handle_open(None, "4821", t0());
        assert_eq!(decision, Decision::failed(AccessReason::NoCodeGenerated));
        assert!(!decision.counts_as_failed_attempt());
    }

    #[test]
    fn test_open_from_fresh_succeeds_and_enters() {
        let mut code = fresh();
        let decision = handle_open(Some(&mut code), "4821", t0() + Duration::seconds(1));
        assert_eq!(decision, Decision::success(None));
        assert_eq!(state(&code), CodeState::Entered);
    }

    #[test]
    fn test_open_with_correct_code_fails_from_entered_and_retired() {
        for target in [CodeState::Entered, CodeState::Retired] {
            let mut code = in_state(target);
            let before = code.clone();
            let decision = handle_open(Some(&mut code), "4821", t0());
            assert_eq!(
                decision,
                Decision::failed(AccessReason::CodeAlreadyUsedForEntryOrExit),
                "state {:?}",
                target
            );
            assert_eq!(code, before, "failed open must not mutate the code");
        }
    }

    #[test]
    fn test_incorrect_code_takes_priority_over_expiry_and_use() {
        let mut code = in_state(CodeState::Retired);
        let decision = handle_open(Some(&mut code), "0000", t0() + Duration::hours(1));
        assert_eq!(decision, Decision::failed(AccessReason::CodeIncorrect));
        assert!(decision.counts_as_failed_attempt());
    }

    #[test]
    fn test_expiry_takes_priority_over_use() {
        let mut code = in_state(CodeState::Entered);
        let valid_until = code.valid_until;
        let decision = handle_open(Some(&mut code), "4821", valid_until);
        assert_eq!(decision, Decision::failed(AccessReason::CodeExpired));
        assert!(decision.counts_as_failed_attempt());
    }

    // ── handle_close ─────────────────────────────────────────────────────────

    #[test]
    fn test_close_after_entry_retires_the_code() {
        let mut code = in_state(CodeState::Entered);
        let decision = handle_close(Some(&mut code), "4821");
        assert_eq!(decision, Decision::success(Some(AccessReason::CycleCompleted)));
        assert!(code.used);
        assert!(!code.used_for_entry);
        assert_eq!(state(&code), CodeState::Retired);
    }

    #[test]
    fn test_close_without_entry_warns_and_leaves_code_untouched() {
        for target in [CodeState::Fresh, CodeState::Retired] {
            let mut code = in_state(target);
            let before = code.clone();
            let decision = handle_close(Some(&mut code), "4821");
            assert_eq!(decision, Decision::warning(AccessReason::CloseWithoutEntry));
            assert_eq!(code, before);
        }
    }

    #[test]
    fn test_close_with_placeholder_always_succeeds() {
        for placeholder in ["", "  ", "NO_CODE", "no_code"] {
            let mut code = in_state(CodeState::Entered);
            let decision = handle_close(Some(&mut code), placeholder);
            assert_eq!(decision, Decision::success(Some(AccessReason::ClosedByButton)));
            assert_eq!(state(&code), CodeState::Entered, "button close must not retire");
        }
        assert_eq!(
            handle_close(None, NO_CODE_PLACEHOLDER),
            Decision::success(Some(AccessReason::ClosedByButton))
        );
    }

    #[test]
    fn test_close_with_unknown_code_warns() {
        let mut code = in_state(CodeState::Entered);
        assert_eq!(
            handle_close(Some(&mut code), "9999"),
            Decision::warning(AccessReason::CodeUnrecognized)
        );
        assert_eq!(state(&code), CodeState::Entered);
        assert_eq!(handle_close(None, "9999"), Decision::warning(AccessReason::CodeUnrecognized));
    }

    // ── evaluate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_every_event_appends_exactly_one_log_entry() {
        let mut doc = doc_with(Some(fresh()));
        let events = [
            access(AccessEvent::DoorOpen, "0000"),
            access(AccessEvent::DoorOpen, "4821"),
            access(AccessEvent::DoorClose, "9999"),
            access(AccessEvent::DoorClose, "4821"),
        ];
        for (i, event) in events.iter().enumerate() {
            evaluate(&mut doc, event, t0() + Duration::seconds(i as i64));
            assert_eq!(doc.access_logs.len(), i + 1);
        }

        let last = doc.access_logs.last().unwrap();
        assert_eq!(last.event, AccessEvent::DoorClose);
        assert_eq!(last.status, AccessStatus::Success);
        assert_eq!(last.reason, Some(AccessReason::CycleCompleted));
        assert_eq!(last.code_used, "4821");
        assert_eq!(last.agent, "controller");
        assert_eq!(last.source_address, "10.0.0.5");
    }

    #[test]
    fn test_three_wrong_opens_raise_one_high_alert() {
        let mut doc = doc_with(Some(fresh()));
        let mut raised = Vec::new();
        for i in 0..3 {
            let outcome = evaluate(&mut doc, &access(AccessEvent::DoorOpen, "0000"), t0() + Duration::seconds(i));
            assert_eq!(outcome.status, AccessStatus::Failed);
            raised.extend(outcome.alert_index);
        }

        // failed_attempt 0, 1, 2, then the escalation as 3.
        assert_eq!(raised, vec![3]);
        assert_eq!(doc.alerts.len(), 4);

        let high: Vec<_> = doc.alerts.iter().filter(|a| a.severity == Severity::High).collect();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].alert_type, MULTIPLE_FAILED_ATTEMPTS);
        assert_eq!(high[0].source, AlertSource::Automatic);
        assert!(high[0].message.contains('3'));

        let per_failure: Vec<_> = doc.alerts.iter().filter(|a| a.alert_type == FAILED_ATTEMPT).collect();
        assert_eq!(per_failure.len(), 3);
        for alert in per_failure {
            assert_eq!(alert.severity, Severity::Medium);
            assert_eq!(alert.source, AlertSource::Automatic);
            assert!(alert.message.contains("00**"));
            assert!(!alert.message.contains("0000"));
        }
        assert_eq!(doc.failed_attempts.count, 0);
    }

    #[test]
    fn test_every_failed_open_raises_a_failed_attempt_alert() {
        let mut doc = doc_with(Some(in_state(CodeState::Entered)));
        evaluate(&mut doc, &access(AccessEvent::DoorOpen, "4821"), t0());
        assert_eq!(doc.alerts.len(), 1);
        assert_eq!(doc.alerts[0].alert_type, FAILED_ATTEMPT);
        assert!(doc.alerts[0].message.contains(AccessReason::CodeAlreadyUsedForEntryOrExit.as_str()));

        let mut doc = doc_with(None);
        evaluate(&mut doc, &access(AccessEvent::DoorOpen, "1234"), t0());
        assert_eq!(doc.alerts.len(), 1);
        assert_eq!(doc.alerts[0].alert_type, FAILED_ATTEMPT);
    }

    #[test]
    fn test_successful_open_raises_no_alert() {
        let mut doc = doc_with(Some(fresh()));
        evaluate(&mut doc, &access(AccessEvent::DoorOpen, "4821"), t0());
        assert!(doc.alerts.is_empty());
    }

    #[test]
    fn test_closes_and_already_used_opens_never_touch_the_failure_window() {
        let mut doc = doc_with(Some(in_state(CodeState::Entered)));
        evaluate(&mut doc, &access(AccessEvent::DoorOpen, "4821"), t0());
        evaluate(&mut doc, &access(AccessEvent::DoorClose, "1111"), t0());
        evaluate(&mut doc, &access(AccessEvent::DoorClose, "2222"), t0());
        evaluate(&mut doc, &access(AccessEvent::DoorClose, "3333"), t0());

        assert_eq!(doc.failed_attempts.count, 0);
        assert!(doc.alerts.iter().all(|a| a.alert_type == FAILED_ATTEMPT));
        assert_eq!(doc.alerts.len(), 1, "closes never raise alerts");
    }

    #[test]
    fn test_open_without_generated_code_is_logged_but_not_tallied() {
        let mut doc = doc_with(None);
        let outcome = evaluate(&mut doc, &access(AccessEvent::DoorOpen, "1234"), t0());
        assert_eq!(outcome.reason, Some(AccessReason::NoCodeGenerated));
        assert_eq!(doc.access_logs.len(), 1);
        assert!(doc.failed_attempts.attempts.is_empty());
    }
}
