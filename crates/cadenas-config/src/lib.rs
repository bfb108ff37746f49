//! # cadenas-config
//!
//! Startup configuration for the Cadenas lock controller: a TOML file,
//! then `CADENAS_*` environment overrides on top.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use cadenas_config::CadenasConfig;
//!
//! let config = CadenasConfig::from_file(Path::new("cadenas.toml"))?.with_env_overrides();
//! ```
//!
//! The configured `settings` only seed a brand-new state document. Once a
//! document exists its persisted settings are authoritative, and changing
//! them is an explicit administrative operation.

pub mod config;

pub use config::CadenasConfig;

// ── Tests ─────────────────────────────────────────────────────────────────────
