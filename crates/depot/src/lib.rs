//! # Depot
//!
//! A publish pipeline for pushing a local project directory to a package
//! cache server.
//!
//! Depot runs one deterministic pipeline per invocation: validate the
//! local project, health-check the configured servers in declaration
//! order, archive the project into a zip artifact with a normalized
//! internal layout, upload the artifact with version metadata, and remove
//! the artifact regardless of the upload outcome.
//!
//! ## Pipeline
//!
//! The core flow is **validate → probe → archive → upload → cleanup**:
//!
//! 1. [`engine::run_publish`] checks the project descriptor, selects the
//!    first reachable endpoint, builds the artifact, uploads it, and
//!    cleans up, returning a [`types::PublishOutcome`] with the ordered
//!    stage events.
//! 2. [`engine::run_check`] runs the validate and probe stages only,
//!    returning a [`types::CheckReport`].
//!
//! ## Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use depot::engine::{self, PublishRequest, RuntimeOptions};
//! use depot::name::RandomNameSource;
//! use depot::types::Endpoint;
//!
//! let req = PublishRequest {
//!     version: "1.0.0".to_string(),
//!     work_dir: PathBuf::from("."),
//!     cache_dir: PathBuf::from("/tmp/depot"),
//!     endpoints: vec![Endpoint::new("https://pkg-cache.internal")],
//! };
//! let outcome = engine::run_publish(
//!     &req,
//!     &RuntimeOptions::default(),
//!     &RandomNameSource,
//!     &mut reporter,
//! )?;
//! std::process::exit(outcome.exit_code);
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: Pipeline state machine, reporter trait, check operation
//! - [`name`]: Artifact naming capability and its random implementation
//! - [`archive`]: Artifact construction (re-export of `depot-archive`)
//! - [`client`]: Probe and upload HTTP client (re-export of `depot-client`)
//! - [`config`]: `.depot.toml` loading (re-export of `depot-config`)
//! - [`types`]: Domain types: endpoints, events, outcomes, errors

/// Pipeline state machine, reporter trait, check operation.
pub mod engine;

/// Artifact naming capability and its random implementation.
pub mod name;

/// Artifact construction.
/// Re-exported from the depot-archive microcrate.
pub use depot_archive as archive;

/// Probe and upload HTTP client.
/// Re-exported from the depot-client microcrate.
pub use depot_client as client;

/// Configuration file loading.
/// Re-exported from the depot-config microcrate.
pub use depot_config as config;

/// Domain types: endpoints, events, outcomes, errors.
/// Re-exported from the depot-types microcrate.
pub use depot_types as types;
