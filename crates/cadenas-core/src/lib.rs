//! # cadenas-core
//!
//! The code lifecycle and access-event state machine for the Cadenas lock
//! controller.
//!
//! This crate provides:
//! - The three seams (`DocumentStore`, `Clock`, `CodeGenerator`)
//! - Code generation and the rules for the single current code
//! - The open/close state machine and the failure window behind it
//! - The access and alert journals
//! - `LockService`, which serializes all of the above against one store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadenas_core::LockService;
//!
//! let service = LockService::with_system_defaults(Box::new(store), Retention::default());
//! let code = service.generate_code()?;
//! ```

pub mod code_store;
pub mod evaluator;
pub mod failure;
pub mod generator;
pub mod journal;
pub mod request;
pub mod service;
pub mod traits;

pub use service::LockService;
