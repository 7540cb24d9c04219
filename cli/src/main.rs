//! sonar CLI - runs the analysis engine against one project.
//!
//! ```text
//! args + config file -> SpawnSpec -> Analyzer::start_client -> Analyzer::analyze -> report
//! ```
//!
//! The report goes to stdout; logs go to stderr.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sonar_analysis::{AnalysisReport, Analyzer, DetectorKind, discover};
use sonar_config::SonarConfig;
use sonar_lsp::{LanguageClient, Notification, ServerConfig, SpawnSpec};

#[derive(Debug, Parser)]
#[command(name = "sonar", version, about)]
struct Cli {
    /// Project root to analyze.
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Print the report as pretty JSON.
    #[arg(long)]
    json: bool,

    /// Config file to use instead of the discovered one.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Detector to run; repeat to run several (default: all).
    #[arg(long = "analysis", value_name = "NAME")]
    analysis: Vec<DetectorKind>,

    /// Per-request timeout in milliseconds.
    #[arg(long, value_name = "N")]
    timeout_ms: Option<u64>,

    /// Language server command and arguments.
    #[arg(last = true, value_name = "SERVER")]
    server: Vec<String>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("SONAR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let ansi = io::stderr().is_terminal();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(ansi)
                .with_writer(io::stderr),
        )
        .with(env_filter)
        .init();
}

/// Fatal run failure tagged with the phase it happened in.
#[derive(Debug)]
struct Failure {
    phase: &'static str,
    error: anyhow::Error,
}

impl Failure {
    fn new(phase: &'static str, error: impl Into<anyhow::Error>) -> Self {
        Self {
            phase,
            error: error.into(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("sonar: {} failed: {:#}", failure.phase, failure.error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let (spec, config) = resolve(&cli).map_err(|e| Failure::new("config", e))?;

    let mut analyzer = Analyzer::new(&spec.workspace_root, config.analysis);
    let paths = discover(&spec.workspace_root, &config.files);
    tracing::info!(
        count = paths.len(),
        root = %spec.workspace_root.display(),
        "Discovered source files"
    );

    let client = analyzer
        .start_client(&spec)
        .await
        .map_err(|e| Failure::new(e.phase(), e))?;
    let diagnostics = watch_diagnostics(&client);

    let report = analyzer
        .analyze(client, &paths, &spec.server)
        .await
        .map_err(|e| Failure::new(e.phase(), e))?;
    tracing::info!(
        published = diagnostics.load(Ordering::Relaxed),
        "Diagnostics reported by server"
    );

    print_report(&report, cli.json).map_err(|e| Failure::new("report", e))
}

/// Merge the config file with command-line overrides.
fn resolve(cli: &Cli) -> Result<(SpawnSpec, SonarConfig)> {
    let root = fs::canonicalize(&cli.project)
        .with_context(|| format!("project root {}", cli.project.display()))?;

    let mut config = match SonarConfig::discover(cli.config.as_deref(), &root)? {
        Some((path, config)) => {
            tracing::debug!(path = %path.display(), "Using config file");
            config
        }
        None => SonarConfig::default(),
    };

    if !cli.analysis.is_empty() {
        config.analysis.detectors.clone_from(&cli.analysis);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.analysis.request_timeout_ms = timeout_ms;
    }

    let server = match (cli.server.split_first(), config.server.take()) {
        (Some((command, args)), Some(mut server)) => {
            server.command.clone_from(command);
            server.args = args.to_vec();
            server
        }
        (Some((command, args)), None) => ServerConfig::new(command.clone(), args.to_vec()),
        (None, Some(server)) => server,
        (None, None) => bail!("no language server command given (pass it after `--`)"),
    };

    Ok((
        SpawnSpec {
            server,
            workspace_root: root,
        },
        config,
    ))
}

/// Count `textDocument/publishDiagnostics` items as they arrive.
fn watch_diagnostics(client: &LanguageClient) -> Arc<AtomicUsize> {
    let total = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&total);
    client.on_notification(move |notification: &Notification| {
        if notification.method != "textDocument/publishDiagnostics" {
            return;
        }
        let Some(params) = &notification.params else {
            return;
        };
        let count = params
            .get("diagnostics")
            .and_then(|d| d.as_array())
            .map_or(0, Vec::len);
        let uri = params.get("uri").and_then(|u| u.as_str()).unwrap_or("");
        tracing::debug!(uri, count, "publishDiagnostics");
        counter.fetch_add(count, Ordering::Relaxed);
    });
    total
}

fn print_report(report: &AnalysisReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}
