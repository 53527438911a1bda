//! Configuration file handling for depot.
//!
//! This crate provides configuration loading from `.depot.toml` files:
//! the candidate repository servers, the artifact cache directory, and
//! HTTP behavior. The pipeline resolves these once per run and treats
//! them as read-only.
//!
//! # Example
//!
//! ```
//! use depot_config::load_config;
//! use std::path::Path;
//!
//! // Load config from a directory (looks for .depot.toml)
//! let config = load_config(Path::new(".")).expect("load config");
//!
//! for endpoint in config.endpoints() {
//!     println!("repository: {}", endpoint.url);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use depot_types::Endpoint;
use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const CONFIG_FILE: &str = ".depot.toml";

/// Get the config file path for a directory
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Complete depot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Artifact cache configuration
    #[serde(default)]
    cache: CacheConfig,
    /// HTTP behavior configuration
    #[serde(default)]
    http: HttpConfig,
    /// Archive construction configuration
    #[serde(default)]
    archive: ArchiveConfig,
    /// Candidate repository servers, in priority order
    #[serde(default)]
    repositories: Vec<RepositoryConfig>,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configured cache directory, if any
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache.dir.as_deref()
    }

    /// Get the per-request HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Get the archive exclude patterns (matched against path components)
    pub fn excludes(&self) -> &[String] {
        &self.archive.excludes
    }

    /// Get the configured repositories as endpoints, in declaration order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.repositories
            .iter()
            .map(|r| Endpoint::new(r.url.clone()))
            .collect()
    }

    /// Add a repository URL (mainly useful for tests and programmatic setup)
    pub fn add_repository(&mut self, url: impl Into<String>) {
        self.repositories.push(RepositoryConfig { url: url.into() });
    }

    /// Set the cache directory
    pub fn set_cache_dir(&mut self, dir: impl Into<PathBuf>) {
        self.cache.dir = Some(dir.into());
    }
}

/// Artifact cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheConfig {
    /// Directory holding temporary artifacts; platform cache dir when unset
    dir: Option<PathBuf>,
}

/// HTTP behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
}

fn default_timeout() -> u64 { 30 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// Archive construction configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ArchiveConfig {
    /// Path components excluded from the artifact
    #[serde(default)]
    excludes: Vec<String>,
}

/// One candidate repository server
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepositoryConfig {
    /// Base URL of the server
    url: String,
}

/// Load configuration from a directory
pub fn load_config(dir: &Path) -> Result<Config> {
    load_config_from_file(&config_path(dir))
}

/// Load configuration from a specific file path
pub fn load_config_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Cache directory used when none is configured: `<platform cache dir>/depot`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("depot")
}

/// Resolve the effective cache directory for a run
pub fn resolve_cache_dir(config: &Config) -> PathBuf {
    config
        .cache_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(default_cache_dir)
}
