//! `LockService`: the single mutation entry point for lock state.
//!
//! Every operation follows the same cycle under one mutex and the store's
//! exclusive hold:
//!
//!   validate input → lock → load document → mutate in memory → retain → save → unlock
//!
//! Input is validated before the lock is taken, so a malformed request never
//! touches state. Holding the lock across load and save makes each operation
//! atomic with respect to the others, including services in other processes
//! sharing the same data file: two concurrent door-opens against a fresh code
//! cannot both observe it as fresh.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use cadenas_contracts::{
    access::{AccessLogEntry, AccessOutcome, AccessRequest},
    alert::{Alert, AlertReceipt, AlertSource, NewAlert, ResolveReceipt},
    code::{Code, CurrentCode},
    document::StateDocument,
    error::{CadenasError, CadenasResult},
    page::Page,
    settings::{Retention, Settings, SettingsPatch},
};

use crate::{
    code_store, evaluator,
    generator::OsRngCodeGenerator,
    journal,
    request::{validate_access, validate_new_alert, validate_settings},
    traits::{Clock, CodeGenerator, DocumentStore, SystemClock},
};

/// Owns the store and serializes every read-modify-write cycle against it.
///
/// Construct one per process and share it by reference.
pub struct LockService {
    store: Box<dyn DocumentStore>,
    clock: Box<dyn Clock>,
    generator: Box<dyn CodeGenerator>,
    retention: Retention,
    gate: Mutex<()>,
}

impl LockService {
    pub fn new(
        store: Box<dyn DocumentStore>,
        clock: Box<dyn Clock>,
        generator: Box<dyn CodeGenerator>,
        retention: Retention,
    ) -> Self {
        Self { store, clock, generator, retention, gate: Mutex::new(()) }
    }

    /// Production wiring: wall clock and OS-random codes.
    pub fn with_system_defaults(store: Box<dyn DocumentStore>, retention: Retention) -> Self {
        Self::new(store, Box::new(SystemClock), Box::new(OsRngCodeGenerator), retention)
    }

    /// Issue a new code, replacing the current one.
    pub fn generate_code(&self) -> CadenasResult<Code> {
        self.mutate(|doc, now| {
            let settings = doc.settings.clone();
            Ok(code_store::generate_new(
                &mut doc.current_code,
                &settings,
                self.generator.as_ref(),
                now,
            ))
        })
    }

    /// The polling view for the door controller.
    pub fn current_code(&self) -> CadenasResult<CurrentCode> {
        self.read(|doc, now| Ok(code_store::current_view(doc.current_code.as_ref(), now)))
    }

    /// Evaluate an open/close event reported by the door controller.
    ///
    /// Denials and warnings are returned as `Ok`; only malformed input and
    /// storage faults are errors.
    pub fn submit_access_event(&self, request: &AccessRequest) -> CadenasResult<AccessOutcome> {
        let access = validate_access(request)?;
        self.mutate(|doc, now| Ok(evaluator::evaluate(doc, &access, now)))
    }

    /// Raise an alert on behalf of an external caller.
    pub fn create_alert(&self, new: NewAlert) -> CadenasResult<AlertReceipt> {
        let new = validate_new_alert(new)?;
        self.mutate(|doc, now| Ok(journal::raise_alert(doc, new, AlertSource::Manual, now)))
    }

    pub fn resolve_alert(&self, index: u64, resolved_by: &str) -> CadenasResult<ResolveReceipt> {
        self.mutate(|doc, now| journal::resolve_alert(&mut doc.alerts, index, resolved_by, now))
    }

    pub fn list_access_logs(&self, page: usize, per_page: usize) -> CadenasResult<Page<AccessLogEntry>> {
        self.read(|doc, _| journal::list_access_logs(doc, page, per_page))
    }

    pub fn list_alerts(
        &self,
        page: usize,
        per_page: usize,
        include_resolved: bool,
    ) -> CadenasResult<Page<Alert>> {
        self.read(|doc, _| journal::list_alerts(doc, page, per_page, include_resolved))
    }

    pub fn settings(&self) -> CadenasResult<Settings> {
        self.read(|doc, _| Ok(doc.settings.clone()))
    }

    /// Administrative settings update. Takes effect from the next generated
    /// code; the current code keeps the expiry it was issued with.
    ///
    /// Fields left out of `patch` keep their stored values. The merge happens
    /// under the same lock as the save, so concurrent partial updates do not
    /// overwrite each other.
    pub fn update_settings(&self, patch: SettingsPatch) -> CadenasResult<Settings> {
        validate_settings(&patch.apply_to(&Settings::default()))?;
        self.mutate(|doc, _| {
            let settings = patch.apply_to(&doc.settings);
            info!(
                code_length = settings.code_length,
                code_validity_seconds = settings.code_validity_seconds,
                max_attempts = settings.max_attempts,
                "settings updated"
            );
            doc.settings = settings.clone();
            Ok(settings)
        })
    }

    // ── Serialization ────────────────────────────────────────────────────────

    fn lock(&self) -> CadenasResult<MutexGuard<'_, ()>> {
        self.gate.lock().map_err(|e| CadenasError::Internal {
            reason: format!("lock service gate poisoned: {}", e),
        })
    }

    /// Load, run `op`, and discard the document. Nothing is saved.
    ///
    /// Loading may itself write (corrupt-document recovery), so reads take the
    /// store's exclusive hold too.
    fn read<R>(
        &self,
        op: impl FnOnce(&StateDocument, DateTime<Utc>) -> CadenasResult<R>,
    ) -> CadenasResult<R> {
        let _guard = self.lock()?;
        let _held = self.store.exclusive()?;
        let doc = self.store.load()?;
        op(&doc, self.clock.now())
    }

    /// Load, run `op`, apply retention, and save, all under the gate.
    ///
    /// If `op` fails nothing is saved. If the save fails the error is
    /// returned to the caller even though `op` already ran in memory.
    fn mutate<R>(
        &self,
        op: impl FnOnce(&mut StateDocument, DateTime<Utc>) -> CadenasResult<R>,
    ) -> CadenasResult<R> {
        let _guard = self.lock()?;
        let _held = self.store.exclusive()?;
        let mut doc = self.store.load()?;
        let result = op(&mut doc, self.clock.now())?;
        journal::apply_retention(&mut doc, &self.retention);
        self.store.save(&doc)?;
        debug!(
            access_logs = doc.access_logs.len(),
            alerts = doc.alerts.len(),
            "state document saved"
        );
        Ok(result)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
