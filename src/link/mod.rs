//! Link bookkeeping for the consuming document
//!
//! The document holds external references into extracted bundles. This
//! layer records which references belong to us, notices when their backing
//! files disappear and re-links them.
//!
//! # Modules
//!
//! - [`error`]: Store and link error types
//! - [`host`]: Host collaborator performing the actual link operations
//! - [`path`]: Document-relative path notation
//! - [`registry`]: `LinkRegistry` with reconcile/establish/repair
//! - [`store`]: Persistent link table (SQLite)
//! - [`types`]: `LinkRecord`, `Anchor`, `RepairReport`

pub mod error;
pub mod host;
pub mod path;
pub mod registry;
pub mod store;
pub mod types;
