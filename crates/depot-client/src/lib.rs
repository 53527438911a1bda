//! Endpoint health probing and artifact upload for depot.
//!
//! This crate talks to candidate package-cache servers: a lightweight
//! reachability probe against `<url>/check`, first-declared-reachable
//! selection, and the artifact upload POST against
//! `<url>/package/upload/composer`.
//!
//! # Example
//!
//! ```no_run
//! use depot_client::EndpointClient;
//! use depot_types::Endpoint;
//!
//! let client = EndpointClient::new().expect("client");
//! let endpoints = vec![Endpoint::new("http://a.test"), Endpoint::new("http://b.test")];
//! let report = client.probe(&endpoints);
//! if let Some(selected) = report.selected {
//!     println!("publishing to {}", selected.url);
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use depot_types::{Endpoint, EndpointCheck, PublishError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent for all requests
pub const USER_AGENT: &str = concat!("depot/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client for probe and upload requests.
#[derive(Debug, Clone)]
pub struct EndpointClient {
    http: reqwest::blocking::Client,
    timeout: Duration,
}

impl EndpointClient {
    /// Create a client with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, timeout })
    }

    /// Get the configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one endpoint: HEAD `<url>/check`, reachable iff HTTP 200.
    ///
    /// Transport errors (timeout, DNS failure, connection refused) count as
    /// not reachable, never as fatal.
    pub fn is_reachable(&self, endpoint: &Endpoint) -> bool {
        match self.http.head(endpoint.health_check_url()).send() {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(_) => false,
        }
    }

    /// Probe every endpoint in declared order and select the first
    /// reachable one.
    ///
    /// Scanning continues past the first success purely to produce a
    /// complete report; the selection is never overwritten by a later
    /// success.
    pub fn probe(&self, endpoints: &[Endpoint]) -> ProbeReport {
        let checks: Vec<EndpointCheck> = endpoints
            .iter()
            .map(|endpoint| EndpointCheck {
                url: endpoint.url.clone(),
                reachable: self.is_reachable(endpoint),
            })
            .collect();

        let selected = first_reachable(&checks).map(|idx| endpoints[idx].clone());
        ProbeReport { checks, selected }
    }

    /// Upload an artifact with its version to the endpoint's upload path.
    ///
    /// Returns `Ok(true)` on HTTP 200, `Ok(false)` on any other status or
    /// on a transport failure. A missing artifact file is an error: by the
    /// time upload runs the pipeline owns a freshly built artifact, so
    /// absence means an internal invariant was violated.
    pub fn upload(&self, endpoint: &Endpoint, version: &str, artifact: &Path) -> Result<bool> {
        if !artifact.exists() {
            return Err(PublishError::ArtifactMissing {
                path: artifact.to_path_buf(),
            }
            .into());
        }

        let bytes = fs::read(artifact)
            .with_context(|| format!("failed to read artifact {}", artifact.display()))?;
        let payload = UploadPayload::new(version, &bytes);
        let body = serde_json::to_string(&payload).context("failed to serialize payload")?;

        let resp = self
            .http
            .post(endpoint.upload_url())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body)
            .send();

        match resp {
            Ok(resp) => Ok(resp.status() == StatusCode::OK),
            Err(_) => Ok(false),
        }
    }
}

/// Outcome of probing a list of endpoints.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Per-endpoint results in declaration order
    pub checks: Vec<EndpointCheck>,
    /// First endpoint found reachable, if any
    pub selected: Option<Endpoint>,
}

/// Index of the first reachable check, scanning in declared order.
///
/// The selection tie-break lives here, separate from transport, so it can
/// be tested exhaustively.
pub fn first_reachable(checks: &[EndpointCheck]) -> Option<usize> {
    checks.iter().position(|check| check.reachable)
}

/// Upload request body: the version string plus the full artifact content,
/// base64-encoded in place. No streaming or chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPayload {
    /// Version being published
    pub version: String,
    /// Base64-encoded artifact bytes
    pub file: String,
}

impl UploadPayload {
    /// Build a payload from raw artifact bytes.
    pub fn new(version: &str, bytes: &[u8]) -> Self {
        Self {
            version: version.to_string(),
            file: BASE64.encode(bytes),
        }
    }

    /// Decode the `file` field back into artifact bytes.
    pub fn decode_file(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.file)
            .context("invalid base64 in payload file field")
    }
}
