//! Bundle version resolution and local archive cache
//!
//! This module resolves LSCherry versions to download URLs, materializes the
//! release archives in a local cache and drives the link lifecycle for the
//! bundle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Catalog   │────▶│    Cache    │────▶│   Manager   │
//! │  (resolve)  │     │  (archives) │     │   (links)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Semver    │     │   Fetcher   │     │LinkRegistry │
//! │ (ordering)  │     │   (HTTP)    │     │  (document) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`archive`]: Archive extraction and wrapper-directory hoisting
//! - [`cache`]: Per-identifier archive cache with repair
//! - [`catalog`]: Static LSCherry version catalog
//! - [`error`]: Error types for fetching, caching and resolving
//! - [`fetcher`]: Fetcher trait and the reqwest-backed implementation
//! - [`manager`]: LSCherry get/remap/repair orchestration
//! - [`resolver`]: Descriptor source trait shared by catalog and registry
//! - [`semver`]: Dotted-numeric version ordering
//! - [`types`]: `VersionDescriptor`, `CacheEntry` and friends
//! - [`update`]: Self update check against GitHub releases

pub mod archive;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod manager;
pub mod resolver;
pub mod semver;
pub mod types;
pub mod update;
