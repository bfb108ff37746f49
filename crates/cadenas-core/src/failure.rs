//! Sliding-then-reset tally of failed door-open attempts.
//!
//! Each failure is appended to the window, attempts older than
//! `FAILURE_WINDOW_SECONDS` are pruned, and the remaining count is compared
//! against `max_attempts`. Reaching the threshold raises one high-severity
//! alert and empties the window, so the next failure counts from one again.
//! The alarm therefore fires once per burst of `max_attempts` failures inside
//! the window, not on every failure after saturation.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use cadenas_contracts::{
    alert::{NewAlert, Severity, MULTIPLE_FAILED_ATTEMPTS},
    failure::{FailedAttempt, FailureWindow},
    settings::Settings,
};

/// Length of the rolling window (15 minutes).
pub const FAILURE_WINDOW_SECONDS: i64 = 15 * 60;

/// Result of recording one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    /// Attempts inside the window once this failure is included, before any reset.
    pub count: u32,
    /// Set when the threshold was reached; the window has already been reset.
    pub breach: Option<NewAlert>,
}

/// Drop attempts at or before `now - FAILURE_WINDOW_SECONDS` and resync `count`.
pub fn prune(window: &mut FailureWindow, now: DateTime<Utc>) {
    let cutoff = now - Duration::seconds(FAILURE_WINDOW_SECONDS);
    let before = window.attempts.len();
    window.attempts.retain(|a| a.timestamp > cutoff);
    window.count = window.attempts.len() as u32;

    if window.attempts.len() != before {
        debug!(
            pruned = before - window.attempts.len(),
            remaining = window.count,
            "pruned stale failed attempts"
        );
    }
}

/// Record one failed open attempt.
///
/// `max_attempts` below one is treated as one.
pub fn record_failure(
    window: &mut FailureWindow,
    source_address: &str,
    client_identifier: &str,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Tally {
    window.attempts.push(FailedAttempt {
        timestamp: now,
        source_address: source_address.to_string(),
        client_identifier: client_identifier.to_string(),
    });
    prune(window, now);

    let count = window.count;
    let threshold = settings.max_attempts.max(1);

    if count < threshold {
        debug!(count, threshold, source = %source_address, "failed attempt recorded");
        return Tally { count, breach: None };
    }

    warn!(
        count,
        threshold,
        source = %source_address,
        client = %client_identifier,
        "failed attempt threshold reached, resetting window"
    );

    *window = FailureWindow::default();

    Tally {
        count,
        breach: Some(NewAlert {
            alert_type: MULTIPLE_FAILED_ATTEMPTS.to_string(),
            message: format!(
                "{} failed open attempts within {} minutes, latest from {} ({})",
                count,
                FAILURE_WINDOW_SECONDS / 60,
                source_address,
                client_identifier
            ),
            severity: Some(Severity::High),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 22, 0, 0).unwrap()
    }

    fn settings(max_attempts: u32) -> Settings {
        Settings { max_attempts, ..Settings::default() }
    }

    #[test]
    fn test_counts_up_below_threshold() {
        let mut window = FailureWindow::default();
        let s = settings(3);

        let first = record_failure(&mut window, "10.0.0.5", "ctrl", &s, t0());
        assert_eq!(first, Tally { count: 1, breach: None });

        let second = record_failure(&mut window, "10.0.0.5", "ctrl", &s, t0() + Duration::seconds(5));
        assert_eq!(second.count, 2);
        assert!(second.breach.is_none());
        assert_eq!(window.count, 2);
        assert_eq!(window.attempts.len(), 2);
    }

    #[test]
    fn test_reaching_threshold_raises_one_high_alert_and_resets() {
        let mut window = FailureWindow::default();
        let s = settings(3);

        record_failure(&mut window, "10.0.0.5", "ctrl", &s, t0());
        record_failure(&mut window, "10.0.0.5", "ctrl", &s, t0() + Duration::seconds(1));
        let third = record_failure(&mut window, "10.0.0.9", "ctrl", &s, t0() + Duration::seconds(2));

        assert_eq!(third.count, 3);
        let alert = third.breach.expect("threshold must raise an alert");
        assert_eq!(alert.alert_type, MULTIPLE_FAILED_ATTEMPTS);
        assert_eq!(alert.severity, Some(Severity::High));
        assert!(alert.message.contains('3'));
        assert!(alert.message.contains("10.0.0.9"));

        assert_eq!(window, FailureWindow::default());
    }

    #[test]
    fn test_failure_after_reset_counts_from_one() {
        let mut window = FailureWindow::default();
        let s = settings(3);
        for i in 0..3 {
            record_failure(&mut window, "a", "c", &s, t0() + Duration::seconds(i));
        }

        let fourth = record_failure(&mut window, "a", "c", &s, t0() + Duration::seconds(3));
        assert_eq!(fourth, Tally { count: 1, breach: None });

        let fifth = record_failure(&mut window, "a", "c", &s, t0() + Duration::seconds(4));
        assert!(fifth.breach.is_none());
        let sixth = record_failure(&mut window, "a", "c", &s, t0() + Duration::seconds(5));
        assert!(sixth.breach.is_some(), "second burst must trip the alarm again");
    }

    #[test]
    fn test_attempts_older_than_window_do_not_count() {
        let mut window = FailureWindow::default();
        let s = settings(2);

        record_failure(&mut window, "a", "c", &s, t0());
        let later = record_failure(&mut window, "a", "c", &s, t0() + Duration::minutes(16));

        assert_eq!(later, Tally { count: 1, breach: None });
        assert_eq!(window.attempts.len(), 1);
        assert_eq!(window.attempts[0].timestamp, t0() + Duration::minutes(16));
    }

    #[test]
    fn test_attempt_exactly_at_window_edge_is_pruned() {
        let mut window = FailureWindow::default();
        record_failure(&mut window, "a", "c", &settings(10), t0());

        prune(&mut window, t0() + Duration::seconds(FAILURE_WINDOW_SECONDS));
        assert_eq!(window.count, 0);
        assert!(window.attempts.is_empty());
    }

    #[test]
    fn test_zero_max_attempts_behaves_as_one() {
        let mut window = FailureWindow::default();
        let tally = record_failure(&mut window, "a", "c", &settings(0), t0());
        assert!(tally.breach.is_some());
    }
}
