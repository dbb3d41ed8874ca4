//! `congress-mirror`: drive the ingestion core from the command line.
//!
//! `run` executes a run request against the in-memory store adapter (a
//! dry-run harness; deployments call [`cm_ingest::run`] with their own
//! adapter) and prints the JSON run report. `config validate` checks the
//! configuration file without touching the network.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cm_client::api::CongressApi;
use cm_client::CancelToken;
use cm_domain::config::{Config, ConfigSeverity};
use cm_domain::family::Family;
use cm_domain::report::{RunMode, RunRequest, TerminalState};
use cm_domain::window::DateWindow;
use cm_store::MemoryStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLI surface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Parser)]
#[command(name = "congress-mirror", about = "Congress.gov corpus ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one ingestion run and print the JSON report.
    Run(RunArgs),
    /// Configuration utilities.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print the version.
    Version,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate the configuration file and report issues.
    Validate,
}

#[derive(Args)]
struct RunArgs {
    /// Run mode.
    #[arg(long, value_enum, default_value = "incremental")]
    mode: ModeArg,
    /// Window start (inclusive), required for refresh.
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Window end (inclusive), required for refresh.
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Trailing days for incremental mode.
    #[arg(long)]
    lookback: Option<i64>,
    /// Comma-separated family tags; all families when omitted.
    #[arg(long, value_delimiter = ',')]
    families: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy)]
enum ModeArg {
    Incremental,
    Refresh,
    Bulk,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Incremental => RunMode::Incremental,
            ModeArg::Refresh => RunMode::Refresh,
            ModeArg::Bulk => RunMode::Bulk,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            init_tracing();
            let (config, _config_path) = load_config()?;
            run_command(args, Arc::new(config)).await
        }
        Command::Config {
            command: ConfigCommand::Validate,
        } => {
            let (config, config_path) = load_config()?;
            let issues = config.validate();
            for issue in &issues {
                eprintln!("{issue}");
            }
            if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
                eprintln!("{config_path}: invalid");
                std::process::exit(1);
            }
            println!("{config_path}: ok");
            Ok(())
        }
        Command::Version => {
            println!("congress-mirror {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured JSON tracing, filter overridable via `RUST_LOG`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cm_ingest=debug")),
        )
        .json()
        .init();
}

/// Load config from `CM_CONFIG` (default `config.toml`), falling back to
/// defaults when the file does not exist.
fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("CM_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {config_path}"))?;
        toml::from_str(&raw).with_context(|| format!("parsing {config_path}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

async fn run_command(args: RunArgs, config: Arc<Config>) -> anyhow::Result<()> {
    let request = build_request(&args)?;

    let fetch = Arc::new(CongressApi::from_config(&config.api).context("building API client")?);
    let store = Arc::new(MemoryStore::new(config.store.table_name.clone()));

    // Ctrl-C cancels cooperatively; a second Ctrl-C kills the process.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("cancellation requested");
                cancel.cancel();
            }
        });
    }

    let report = cm_ingest::run(request, config, fetch, store, cancel)
        .await
        .context("run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.state == TerminalState::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn build_request(args: &RunArgs) -> anyhow::Result<RunRequest> {
    let mut families = Vec::new();
    for tag in &args.families {
        let family = Family::from_tag(tag.trim())
            .ok_or_else(|| anyhow::anyhow!("unknown family '{tag}'"))?;
        families.push(family);
    }

    let window = match (args.from, args.to) {
        (Some(from), Some(to)) => {
            anyhow::ensure!(from <= to, "--from must not be after --to");
            // Inclusive CLI bounds → half-open window.
            Some(DateWindow::new(from, to + Duration::days(1)))
        }
        (None, None) => None,
        _ => anyhow::bail!("--from and --to must be given together"),
    };

    Ok(RunRequest {
        mode: args.mode.into(),
        window,
        lookback_days: args.lookback,
        families,
    })
}
