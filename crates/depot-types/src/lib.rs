//! Core domain types for depot.
//!
//! This crate provides the fundamental types used across the depot ecosystem
//! for endpoint selection, stage reporting, and publish outcomes.
//!
//! # Example
//!
//! ```
//! use depot_types::Endpoint;
//!
//! let endpoint = Endpoint::new("https://pkg-cache.internal/");
//! assert_eq!(endpoint.health_check_url(), "https://pkg-cache.internal/check");
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path appended to an endpoint base URL for health probes.
pub const HEALTH_CHECK_PATH: &str = "/check";

/// Path appended to an endpoint base URL for package uploads.
pub const UPLOAD_PATH: &str = "/package/upload/composer";

/// Project descriptor file that must exist before a publish may proceed.
pub const PROJECT_MARKER: &str = "composer.json";

/// A candidate package-cache server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL (e.g., "https://pkg-cache-a.internal")
    pub url: String,
}

impl Endpoint {
    /// Create an endpoint from a base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// URL probed to decide whether this endpoint is usable.
    pub fn health_check_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), HEALTH_CHECK_PATH)
    }

    /// URL that accepts package uploads.
    pub fn upload_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), UPLOAD_PATH)
    }
}

/// Result of probing one endpoint, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCheck {
    /// Endpoint base URL
    pub url: String,
    /// Whether the health check returned HTTP 200
    pub reachable: bool,
}

/// Pipeline stage a status event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Local project validation
    Preflight,
    /// Endpoint health probing
    Probe,
    /// Artifact construction
    Archive,
    /// Artifact upload
    Upload,
    /// Temporary artifact removal
    Cleanup,
    /// Terminal result
    Finish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Preflight => write!(f, "preflight"),
            Stage::Probe => write!(f, "probe"),
            Stage::Archive => write!(f, "archive"),
            Stage::Upload => write!(f, "upload"),
            Stage::Cleanup => write!(f, "cleanup"),
            Stage::Finish => write!(f, "finish"),
        }
    }
}

/// Severity of a stage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Progress note
    Info,
    /// Stage step passed
    Ok,
    /// Stage step failed but the run may continue
    Fail,
    /// Stage step failed and aborts the run
    Error,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageState::Info => write!(f, "info"),
            StageState::Ok => write!(f, "ok"),
            StageState::Fail => write!(f, "fail"),
            StageState::Error => write!(f, "error"),
        }
    }
}

/// One status line emitted by the pipeline.
///
/// Events are surfaced to the caller in emission order; they are never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Stage the event belongs to
    pub stage: Stage,
    /// Severity
    pub state: StageState,
    /// Human-readable message
    pub message: String,
}

impl StageEvent {
    /// Create an event stamped with the current time.
    pub fn new(stage: Stage, state: StageState, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stage,
            state,
            message: message.into(),
        }
    }
}

/// Terminal result of one publish run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Whether the upload was accepted
    pub success: bool,
    /// Process exit code: 0 on success, 1 otherwise
    pub exit_code: i32,
    /// Ordered stage events emitted during the run
    pub events: Vec<StageEvent>,
}

impl PublishOutcome {
    /// Outcome for an accepted upload.
    pub fn succeeded(events: Vec<StageEvent>) -> Self {
        Self {
            success: true,
            exit_code: 0,
            events,
        }
    }

    /// Outcome for a run that aborted or whose upload was rejected.
    pub fn failed(events: Vec<StageEvent>) -> Self {
        Self {
            success: false,
            exit_code: 1,
            events,
        }
    }
}

/// Report produced by the standalone check operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// Whether the project descriptor file was found
    pub marker_present: bool,
    /// Per-endpoint probe results in declaration order
    pub checks: Vec<EndpointCheck>,
    /// First endpoint found reachable, if any
    pub selected: Option<Endpoint>,
}

impl CheckReport {
    /// True when a publish run from this state could reach the upload stage.
    pub fn usable(&self) -> bool {
        self.marker_present && self.selected.is_some()
    }
}

/// Errors that abort a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The project descriptor file is missing.
    #[error("no composer.json found in {}", dir.display())]
    ProjectNotFound {
        /// Directory that was inspected
        dir: PathBuf,
    },

    /// Every configured endpoint failed its health check.
    #[error("no usable remote repository server")]
    NoUsableEndpoint,

    /// The artifact vanished between build and upload.
    #[error("artifact not found at {}", path.display())]
    ArtifactMissing {
        /// Expected artifact location
        path: PathBuf,
    },

    /// The selected endpoint rejected the upload.
    #[error("upload rejected by {url}")]
    UploadRejected {
        /// Endpoint base URL
        url: String,
    },
}
