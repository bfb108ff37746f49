//! Seams between the state machine and the outside world.
//!
//! - `DocumentStore` loads and replaces the single persisted state document
//! - `Clock`         supplies "now" so expiry and window pruning are testable
//! - `CodeGenerator` produces the digit strings handed to the lock
//!
//! `LockService` owns one of each and serializes every read-modify-write
//! cycle against the store: its own mutex covers threads in one process, and
//! `DocumentStore::exclusive` covers other processes sharing the same store.

use chrono::{DateTime, Utc};

use cadenas_contracts::{document::StateDocument, error::CadenasResult};

/// Durable home of the state document.
///
/// Implementations are **trusted** to persist the document verbatim. They
/// never see partial updates: the service always hands over the complete
/// document it intends to be current.
pub trait DocumentStore: Send + Sync {
    /// Take an exclusive hold on the store for one load → save cycle.
    ///
    /// Blocks until every other holder, in this or any other process, has
    /// dropped its guard. Stores that live inside a single process rely on the
    /// service mutex and keep the default, which holds nothing.
    fn exclusive(&self) -> CadenasResult<StoreGuard> {
        Ok(StoreGuard::unheld())
    }

    /// Load the current document.
    ///
    /// A missing document is not an error: implementations return a fresh
    /// default. A corrupt document is quarantined and replaced by a fresh
    /// default, logged at warn level.
    fn load(&self) -> CadenasResult<StateDocument>;

    /// Replace the stored document with `doc`.
    ///
    /// Must return `CadenasError::PersistenceFailure` if the document could
    /// not be durably written. Failures are never swallowed.
    fn save(&self, doc: &StateDocument) -> CadenasResult<()>;
}

/// Exclusive hold on a store. Released when dropped.
pub struct StoreGuard {
    held: Option<Box<dyn Send>>,
}

impl StoreGuard {
    /// A guard that holds nothing.
    pub fn unheld() -> Self {
        Self { held: None }
    }

    /// Keep `held` alive until the guard is dropped.
    pub fn holding(held: impl Send + 'static) -> Self {
        Self { held: Some(Box::new(held)) }
    }
}

impl std::fmt::Debug for StoreGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreGuard").field("held", &self.held.is_some()).finish()
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Produces access codes.
///
/// Guessing the code is the only barrier to opening the lock, so production
/// implementations must draw from a cryptographically secure source.
pub trait CodeGenerator: Send + Sync {
    /// Return a string of exactly `length` decimal digits.
    ///
    /// Callers pass a length already normalized by `normalize_code_length`.
    fn generate(&self, length: usize) -> String;
}
