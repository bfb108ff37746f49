//! In-memory implementation of `DocumentStore`.
//!
//! Holds the document in an `Arc<Mutex<_>>`. Nothing survives a restart;
//! use it for tests and for running the service without a data file.

use std::sync::{Arc, Mutex};

use tracing::debug;

use cadenas_contracts::{
    document::StateDocument,
    error::{CadenasError, CadenasResult},
    settings::Settings,
};
use cadenas_core::traits::DocumentStore;

#[derive(Debug, Clone)]
pub struct InMemoryStore {
    defaults: Settings,
    doc: Arc<Mutex<Option<StateDocument>>>,
}

impl InMemoryStore {
    /// An empty store. The first load yields a fresh document built from `defaults`.
    pub fn new(defaults: Settings) -> Self {
        Self { defaults, doc: Arc::new(Mutex::new(None)) }
    }

    /// A store pre-seeded with `doc`.
    pub fn with_document(doc: StateDocument) -> Self {
        Self { defaults: doc.settings.clone(), doc: Arc::new(Mutex::new(Some(doc))) }
    }
}

impl DocumentStore for InMemoryStore {
    fn load(&self) -> CadenasResult<StateDocument> {
        let guard = self.doc.lock().map_err(|e| CadenasError::Internal {
            reason: format!("in-memory store lock poisoned: {}", e),
        })?;
        Ok(guard
            .clone()
            .unwrap_or_else(|| StateDocument::new(self.defaults.clone())))
    }

    fn save(&self, doc: &StateDocument) -> CadenasResult<()> {
        let mut guard = self.doc.lock().map_err(|e| CadenasError::PersistenceFailure {
            reason: format!("in-memory store lock poisoned: {}", e),
        })?;
        *guard = Some(doc.clone());
        debug!(alerts = doc.alerts.len(), access_logs = doc.access_logs.len(), "document stored in memory");
        Ok(())
    }
}
