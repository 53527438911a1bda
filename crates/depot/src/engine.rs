//! Core publish and check pipeline.
//!
//! One pipeline run is strictly sequential:
//! `validate → probe → archive → upload → cleanup`. Each stage either
//! advances or aborts; there are no retries and no backward transitions.
//! The artifact file is the only resource needing disciplined release: its
//! path enters a scope guard before the archiver runs, so it is removed on
//! every exit path after that point.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use depot_archive::{Archiver, WalkLister, ZipArchiver};
use depot_client::{EndpointClient, first_reachable};
use depot_types::{
    CheckReport, Endpoint, EndpointCheck, PROJECT_MARKER, PublishError, PublishOutcome, Stage,
    StageEvent, StageState,
};

use crate::name::NameSource;

/// Sink for human-readable pipeline progress.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Everything one publish run needs, resolved once by the caller.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Version string to publish
    pub version: String,
    /// Project directory being published
    pub work_dir: PathBuf,
    /// Directory holding the temporary artifact
    pub cache_dir: PathBuf,
    /// Candidate servers in priority order
    pub endpoints: Vec<Endpoint>,
}

/// Runtime knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Archive exclude patterns (path components)
    pub excludes: Vec<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(depot_client::DEFAULT_TIMEOUT_SECS),
            excludes: Vec::new(),
        }
    }
}

/// Scope guard owning the artifact file.
///
/// Armed the moment the destination path is computed, before the archiver
/// runs, so a partially written archive is removed on the build-error path
/// as well as after upload.
struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the artifact now; the eventual drop becomes a no-op.
    fn remove(&mut self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
        } else {
            Ok(())
        }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        let _ = self.remove();
    }
}

/// Collects stage events for the outcome while forwarding them to the
/// reporter as they occur.
struct EventSink<'a> {
    events: Vec<StageEvent>,
    reporter: &'a mut dyn Reporter,
}

impl EventSink<'_> {
    fn emit(&mut self, stage: Stage, state: StageState, message: impl Into<String>) {
        let event = StageEvent::new(stage, state, message);
        match event.state {
            StageState::Info | StageState::Ok => self.reporter.info(&event.message),
            StageState::Fail => self.reporter.warn(&event.message),
            StageState::Error => self.reporter.error(&event.message),
        }
        self.events.push(event);
    }
}

/// Execute one full publish run.
///
/// Expected failures (missing descriptor, no usable endpoint, rejected
/// upload) become a failed [`PublishOutcome`] after cleanup has run.
/// Archive and upload I/O errors propagate as errors, with the artifact
/// removed by the scope guard on the way out.
pub fn run_publish(
    req: &PublishRequest,
    opts: &RuntimeOptions,
    names: &dyn NameSource,
    reporter: &mut dyn Reporter,
) -> Result<PublishOutcome> {
    let mut sink = EventSink {
        events: Vec::new(),
        reporter,
    };

    sink.emit(
        Stage::Preflight,
        StageState::Info,
        format!("working on {}", req.work_dir.display()),
    );
    sink.emit(
        Stage::Preflight,
        StageState::Info,
        format!("artifact cache at {}", req.cache_dir.display()),
    );

    if !req.work_dir.join(PROJECT_MARKER).exists() {
        let err = PublishError::ProjectNotFound {
            dir: req.work_dir.clone(),
        };
        sink.emit(Stage::Preflight, StageState::Error, err.to_string());
        return Ok(PublishOutcome::failed(sink.events));
    }
    sink.emit(
        Stage::Preflight,
        StageState::Ok,
        format!("found {PROJECT_MARKER}"),
    );

    let client = EndpointClient::with_timeout(opts.timeout)?;

    let mut checks = Vec::with_capacity(req.endpoints.len());
    for endpoint in &req.endpoints {
        let reachable = client.is_reachable(endpoint);
        let state = if reachable { StageState::Ok } else { StageState::Fail };
        sink.emit(Stage::Probe, state, format!("connecting remote {}", endpoint.url));
        checks.push(EndpointCheck {
            url: endpoint.url.clone(),
            reachable,
        });
    }

    // First declared reachable endpoint wins; later successes were probed
    // only for reporting.
    let selected = match first_reachable(&checks) {
        Some(idx) => req.endpoints[idx].clone(),
        None => {
            sink.emit(
                Stage::Probe,
                StageState::Error,
                PublishError::NoUsableEndpoint.to_string(),
            );
            return Ok(PublishOutcome::failed(sink.events));
        }
    };

    fs::create_dir_all(&req.cache_dir).with_context(|| {
        format!("failed to create cache directory {}", req.cache_dir.display())
    })?;
    let target = req.cache_dir.join(format!("{}.zip", names.artifact_stem()));
    let mut guard = ArtifactGuard::new(target);

    sink.emit(Stage::Archive, StageState::Info, "compressing package");
    let archiver = ZipArchiver::with_lister(WalkLister::with_excludes(opts.excludes.clone()));
    if let Err(err) = archiver.build(&req.work_dir, guard.path()) {
        sink.emit(Stage::Archive, StageState::Error, err.to_string());
        return Err(err.into());
    }
    sink.emit(
        Stage::Archive,
        StageState::Ok,
        format!("created {}", guard.path().display()),
    );

    sink.emit(
        Stage::Upload,
        StageState::Info,
        format!("publishing package ver.{} to {}", req.version, selected.url),
    );
    let accepted = match client.upload(&selected, &req.version, guard.path()) {
        Ok(accepted) => accepted,
        Err(err) => {
            sink.emit(Stage::Upload, StageState::Error, format!("{err:#}"));
            return Err(err);
        }
    };

    // Cleanup runs no matter how the upload went.
    match guard.remove() {
        Ok(()) => sink.emit(Stage::Cleanup, StageState::Info, "removed temporary artifact"),
        Err(err) => sink.emit(
            Stage::Cleanup,
            StageState::Fail,
            format!("failed to remove temporary artifact: {err}"),
        ),
    }

    if accepted {
        sink.emit(
            Stage::Finish,
            StageState::Ok,
            format!("Successfully upload package ver.{}", req.version),
        );
        Ok(PublishOutcome::succeeded(sink.events))
    } else {
        let err = PublishError::UploadRejected {
            url: selected.url.clone(),
        };
        sink.emit(
            Stage::Finish,
            StageState::Fail,
            format!("Fail to upload package ({err})"),
        );
        Ok(PublishOutcome::failed(sink.events))
    }
}

/// Run the validate and probe stages only, building and uploading nothing.
pub fn run_check(
    work_dir: &Path,
    endpoints: &[Endpoint],
    opts: &RuntimeOptions,
    reporter: &mut dyn Reporter,
) -> Result<CheckReport> {
    let marker_present = work_dir.join(PROJECT_MARKER).exists();
    if marker_present {
        reporter.info(&format!("found {PROJECT_MARKER} in {}", work_dir.display()));
    } else {
        reporter.warn(&format!("no {PROJECT_MARKER} in {}", work_dir.display()));
    }

    let client = EndpointClient::with_timeout(opts.timeout)?;
    let probe = client.probe(endpoints);
    for check in &probe.checks {
        if check.reachable {
            reporter.info(&format!("connecting remote {} ok", check.url));
        } else {
            reporter.warn(&format!("connecting remote {} failed", check.url));
        }
    }

    Ok(CheckReport {
        marker_present,
        checks: probe.checks,
        selected: probe.selected,
    })
}
