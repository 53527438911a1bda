use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use depot::config;
use depot::engine::{self, PublishRequest, Reporter, RuntimeOptions};
use depot::name::RandomNameSource;
use depot::types::Endpoint;

#[derive(Parser, Debug)]
#[command(name = "depot", version)]
#[command(about = "Publish a project directory to a package-cache server")]
struct Cli {
    /// Path to the config file (default: .depot.toml in the working directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the artifact cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Per-request HTTP timeout (e.g. 30s, 500ms)
    #[arg(long, default_value = "30s")]
    timeout: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish the working directory to the first healthy configured server.
    Publish {
        /// Version to publish (prompted when omitted).
        #[arg(long, short = 'b')]
        bump: Option<String>,

        /// Use a single custom remote server instead of the configured list.
        #[arg(long, short = 'r')]
        remote: Option<String>,
    },
    /// Validate the project and probe the configured servers without publishing.
    Check {
        /// Use a single custom remote server instead of the configured list.
        #[arg(long, short = 'r')]
        remote: Option<String>,
    },
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[error] {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let work_dir = env::current_dir().context("failed to resolve working directory")?;
    let cfg = match &cli.config {
        Some(path) => config::load_config_from_file(path)?,
        None => config::load_config(&work_dir)?,
    };

    let opts = RuntimeOptions {
        timeout: parse_duration(&cli.timeout)?,
        excludes: cfg.excludes().to_vec(),
    };
    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| config::resolve_cache_dir(&cfg));

    let mut reporter = CliReporter;

    match cli.cmd {
        Commands::Publish { bump, remote } => {
            let endpoints = resolve_endpoints(&cfg, remote)?;
            let version = match bump {
                Some(version) => version,
                None => prompt_version()?,
            };

            let req = PublishRequest {
                version,
                work_dir,
                cache_dir,
                endpoints,
            };
            let outcome = engine::run_publish(&req, &opts, &RandomNameSource, &mut reporter)?;

            Ok(exit_code(outcome.exit_code == 0))
        }
        Commands::Check { remote } => {
            let endpoints = resolve_endpoints(&cfg, remote)?;
            let report = engine::run_check(&work_dir, &endpoints, &opts, &mut reporter)?;

            println!("marker_present: {}", report.marker_present);
            for check in &report.checks {
                let status = if check.reachable { "reachable" } else { "unreachable" };
                println!("{}: {status}", check.url);
            }
            match &report.selected {
                Some(endpoint) => println!("selected: {}", endpoint.url),
                None => println!("selected: none"),
            }

            Ok(exit_code(report.usable()))
        }
    }
}

/// The `--remote` override replaces the configured repository list.
fn resolve_endpoints(cfg: &config::Config, remote: Option<String>) -> Result<Vec<Endpoint>> {
    let endpoints = match remote {
        Some(url) => vec![Endpoint::new(url)],
        None => cfg.endpoints(),
    };
    if endpoints.is_empty() {
        bail!("no repositories configured (add [[repositories]] to .depot.toml or pass --remote)");
    }
    Ok(endpoints)
}

fn prompt_version() -> Result<String> {
    eprint!("Version to bump [1.0.0]: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read version from stdin")?;

    let version = line.trim();
    Ok(if version.is_empty() {
        "1.0.0".to_string()
    } else {
        version.to_string()
    })
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
