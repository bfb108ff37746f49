//! Append-only access and alert journals.
//!
//! Both journals are stored oldest-first in the state document. Reads return
//! them newest-first; retention drops the oldest entries once a cap is
//! exceeded. Alerts are only ever mutated once, to mark them resolved.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use cadenas_contracts::{
    access::AccessLogEntry,
    alert::{Alert, AlertReceipt, AlertSource, NewAlert, ResolveReceipt},
    document::StateDocument,
    error::{CadenasError, CadenasResult},
    page::Page,
    settings::Retention,
};

/// Largest page a caller may request.
pub const MAX_PER_PAGE: usize = 100;

pub fn append_access(doc: &mut StateDocument, entry: AccessLogEntry) {
    doc.access_logs.push(entry);
}

/// Append an alert and assign it the next permanent index.
pub fn raise_alert(
    doc: &mut StateDocument,
    new: NewAlert,
    source: AlertSource,
    now: DateTime<Utc>,
) -> AlertReceipt {
    let index = doc.next_alert_index;
    doc.next_alert_index += 1;

    let alert = Alert {
        index,
        alert_type: new.alert_type,
        message: new.message,
        severity: new.severity.unwrap_or_default(),
        source,
        timestamp: now,
        resolved: false,
        resolved_at: None,
        resolved_by: None,
    };

    warn!(
        alert_index = index,
        alert_type = %alert.alert_type,
        severity = %alert.severity,
        source = ?source,
        "alert raised"
    );

    doc.alerts.push(alert);
    AlertReceipt { alert_index: index, timestamp: now }
}

/// Mark the alert with `index` as resolved by `resolved_by`.
pub fn resolve_alert(
    alerts: &mut [Alert],
    index: u64,
    resolved_by: &str,
    now: DateTime<Utc>,
) -> CadenasResult<ResolveReceipt> {
    let alert = alerts
        .iter_mut()
        .find(|a| a.index == index)
        .ok_or(CadenasError::NotFound { index })?;

    if alert.resolved {
        return Err(CadenasError::AlreadyResolved { index });
    }

    alert.resolved = true;
    alert.resolved_at = Some(now);
    alert.resolved_by = Some(resolved_by.to_string());

    info!(alert_index = index, resolved_by = %resolved_by, "alert resolved");

    Ok(ResolveReceipt { alert_index: index, resolved_at: now })
}

/// Trim both journals down to their caps, oldest entries first.
pub fn apply_retention(doc: &mut StateDocument, retention: &Retention) {
    trim_oldest(&mut doc.access_logs, retention.max_access_logs, |e| e.timestamp);
    trim_oldest(&mut doc.alerts, retention.max_alerts, |a| a.timestamp);
}

fn trim_oldest<T>(entries: &mut Vec<T>, cap: usize, timestamp: impl Fn(&T) -> DateTime<Utc>) {
    if entries.len() <= cap {
        return;
    }
    // Stable: equal timestamps keep append order.
    entries.sort_by_key(|e| timestamp(e));
    let excess = entries.len() - cap;
    entries.drain(..excess);
}

/// Access log page, newest first.
pub fn list_access_logs(
    doc: &StateDocument,
    page: usize,
    per_page: usize,
) -> CadenasResult<Page<AccessLogEntry>> {
    let mut entries: Vec<&AccessLogEntry> = doc.access_logs.iter().rev().collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    paginate(entries, page, per_page)
}

/// Alert page, newest first. Resolved alerts are skipped unless requested.
pub fn list_alerts(
    doc: &StateDocument,
    page: usize,
    per_page: usize,
    include_resolved: bool,
) -> CadenasResult<Page<Alert>> {
    let mut alerts: Vec<&Alert> = doc
        .alerts
        .iter()
        .filter(|a| include_resolved || !a.resolved)
        .collect();
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.index.cmp(&a.index)));
    paginate(alerts, page, per_page)
}

/// Cut one page out of an already-ordered list.
///
/// `page` is 1-based. A page past the end is empty, not an error.
pub fn paginate<T: Clone>(sorted: Vec<&T>, page: usize, per_page: usize) -> CadenasResult<Page<T>> {
    if page == 0 {
        return Err(CadenasError::Validation { reason: "page must be at least 1".to_string() });
    }
    if per_page == 0 {
        return Err(CadenasError::Validation { reason: "per_page must be at least 1".to_string() });
    }
    let per_page = per_page.min(MAX_PER_PAGE);

    let total = sorted.len();
    let pages = total.div_ceil(per_page);
    let items = sorted
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .cloned()
        .collect();

    Ok(Page { items, total, page, per_page, pages })
}
