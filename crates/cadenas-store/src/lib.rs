//! # cadenas-store
//!
//! `DocumentStore` implementations for the Cadenas lock controller.
//!
//! - [`InMemoryStore`]: volatile, for tests and ephemeral runs
//! - [`JsonFileStore`]: one JSON file, atomically replaced on every save,
//!   with corrupt files quarantined rather than overwritten
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadenas_store::JsonFileStore;
//! use cadenas_core::LockService;
//!
//! let store = JsonFileStore::new("codes.json", Settings::default());
//! let service = LockService::with_system_defaults(Box::new(store), Retention::default());
//! ```

pub mod file;
pub mod memory;

pub use file::{parse_document, JsonFileStore};
pub use memory::InMemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
