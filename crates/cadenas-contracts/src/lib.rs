//! # cadenas-contracts
//!
//! Shared types, the persisted document layout, and errors for the Cadenas
//! lock controller.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, parsing of closed enumerations, and
//! structural checks on the persisted document.

pub mod access;
pub mod alert;
pub mod code;
pub mod document;
pub mod error;
pub mod failure;
pub mod page;
pub mod settings;

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use access::{AccessEvent, AccessLogEntry, AccessReason, AccessStatus};
    use alert::{Alert, AlertSource, Severity};
    use code::Code;
    use document::{StateDocument, DOCUMENT_VERSION};
    use error::CadenasError;
    use failure::FailedAttempt;
    use settings::{Settings, SettingsPatch};

    fn sample_code() -> Code {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        Code {
            value: "4821".to_string(),
            generated_at: at,
            valid_until: at + chrono::Duration::seconds(300),
            used: false,
            used_for_entry: false,
        }
    }

    // ── Closed enumerations ──────────────────────────────────────────────────

    #[test]
    fn test_access_event_parses_wire_names() {
        assert_eq!("door_open".parse::<AccessEvent>().unwrap(), AccessEvent::DoorOpen);
        assert_eq!(" door_close ".parse::<AccessEvent>().unwrap(), AccessEvent::DoorClose);
    }

    #[test]
    fn test_access_event_rejects_unknown_and_empty() {
        match "door_slam".parse::<AccessEvent>() {
            Err(CadenasError::Validation { reason }) => assert!(reason.contains("door_slam")),
            other => panic!("expected Validation, got {:?}", other),
        }
        match "".parse::<AccessEvent>() {
            Err(CadenasError::Validation { reason }) => {
                assert!(reason.contains("event type required"))
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_reason_serializes_as_snake_case_code() {
        let json = serde_json::to_value(AccessReason::CodeAlreadyUsedForEntryOrExit).unwrap();
        assert_eq!(json, json!("code_already_used_for_entry_or_exit"));
        assert_eq!(
            AccessReason::CodeAlreadyUsedForEntryOrExit.to_string(),
            "code_already_used_for_entry_or_exit"
        );
    }

    #[test]
    fn test_severity_defaults_to_medium_and_parses_case_insensitively() {
        assert_eq!(Severity::default(), Severity::Medium);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
        assert!(Severity::Critical > Severity::High);
    }

    // ── Wire shape ───────────────────────────────────────────────────────────

    #[test]
    fn test_alert_type_field_is_named_type_on_the_wire() {
        let alert = Alert {
            index: 7,
            alert_type: "tamper".to_string(),
            message: "case opened".to_string(),
            severity: Severity::Critical,
            source: AlertSource::Manual,
            timestamp: Utc::now(),
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], json!("tamper"));
        assert!(value.get("alert_type").is_none());
    }

    #[test]
    fn test_code_rejects_unknown_fields() {
        let mut value = serde_json::to_value(sample_code()).unwrap();
        value["colour"] = json!("blue");
        assert!(serde_json::from_value::<Code>(value).is_err());
    }

    #[test]
    fn test_access_log_entry_rejects_missing_fields() {
        let value = json!({
            "timestamp": "2026-03-01T12:00:00Z",
            "event": "door_open",
            "code_used": "1234",
            "status": "failed",
            "reason": "code_incorrect",
            "source_address": "10.0.0.5"
        });
        // `agent` is missing.
        assert!(serde_json::from_value::<AccessLogEntry>(value).is_err());
    }

    #[test]
    fn test_document_round_trips_without_field_loss() {
        let mut doc = StateDocument::new(Settings::default());
        doc.current_code = Some(sample_code());
        doc.access_logs.push(AccessLogEntry {
            timestamp: Utc::now(),
            event: AccessEvent::DoorOpen,
            code_used: "0000".to_string(),
            agent: "controller".to_string(),
            status: AccessStatus::Failed,
            reason: Some(AccessReason::CodeIncorrect),
            source_address: "10.0.0.5".to_string(),
        });
        doc.failed_attempts.attempts.push(FailedAttempt {
            timestamp: Utc::now(),
            source_address: "10.0.0.5".to_string(),
            client_identifier: "controller".to_string(),
        });
        doc.failed_attempts.count = 1;

        let json = serde_json::to_string(&doc).unwrap();
        let decoded: StateDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, doc);
    }

    // ── Integrity checks ─────────────────────────────────────────────────────

    #[test]
    fn test_settings_patch_keeps_omitted_fields() {
        let base = Settings { code_length: 6, code_validity_seconds: 120, max_attempts: 5 };
        let patch: SettingsPatch = serde_json::from_value(json!({ "max_attempts": 2 })).unwrap();
        assert_eq!(patch.apply_to(&base), Settings { max_attempts: 2, ..base.clone() });
        assert_eq!(SettingsPatch::default().apply_to(&base), base);
        assert!(serde_json::from_value::<SettingsPatch>(json!({ "lenght": 6 })).is_err());
    }

    #[test]
    fn test_fresh_document_passes_integrity() {
        let doc = StateDocument::new(Settings::default());
        assert_eq!(doc.version, DOCUMENT_VERSION);
        doc.check_integrity().unwrap();
    }

    #[test]
    fn test_integrity_rejects_count_mismatch() {
        let mut doc = StateDocument::new(Settings::default());
        doc.failed_attempts.count = 2;
        match doc.check_integrity() {
            Err(CadenasError::StorageCorruption { reason }) => {
                assert!(reason.contains("does not match"))
            }
            other => panic!("expected StorageCorruption, got {:?}", other),
        }
    }

    #[test]
    fn test_integrity_rejects_future_version() {
        let mut doc = StateDocument::new(Settings::default());
        doc.version = DOCUMENT_VERSION + 1;
        assert!(matches!(
            doc.check_integrity(),
            Err(CadenasError::StorageCorruption { .. })
        ));
    }

    #[test]
    fn test_integrity_rejects_non_digit_code() {
        let mut doc = StateDocument::new(Settings::default());
        let mut code = sample_code();
        code.value = "12a4".to_string();
        doc.current_code = Some(code);
        assert!(doc.check_integrity().is_err());
    }

    // ── Error display and kinds ──────────────────────────────────────────────

    #[test]
    fn test_error_display_carries_context() {
        let err = CadenasError::NotFound { index: 42 };
        assert!(err.to_string().contains("42"));
        assert_eq!(err.kind(), "not_found");

        let err = CadenasError::PersistenceFailure { reason: "disk full".to_string() };
        assert!(err.to_string().contains("disk full"));
        assert_eq!(err.kind(), "persistence_failure");

        let err = CadenasError::AlreadyResolved { index: 3 };
        assert!(err.to_string().contains("already resolved"));
        assert_eq!(err.kind(), "already_resolved");
    }
}
