//! sqlmin command-line interface
//!
//! Reduces a statement that fails in the reference planner to a minimal
//! statement that fails the same way.
//!
//! ## Usage
//!
//! ```bash
//! sqlmin --schema schema.json --query "select a, b from t1 where c = 1"
//! sqlmin --schema schema.json --file repro.sql --unsupported having --json
//! ```
//!
//! ## Logging
//!
//! - `SQLMIN_LOG`: filter directives (overrides `[logging] level`)
//! - `SQLMIN_LOG_FILE`: append logs to this file instead of stderr

use anyhow::{bail, Context};
use clap::Parser;
use sqlmin::config::{LogFormat, LoggingConfig};
use sqlmin::planner::PlannerFeature;
use sqlmin::{
    parse_statement, Config, FailureSignature, Minimizer, ReproductionOracle, SchemaContext,
    SchemaPlanner,
};

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Debug, Parser)]
#[command(name = "sqlmin", version, about = "Shrink a statement that breaks the planner")]
struct Cli {
    /// Schema file (JSON)
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,

    /// Statement to minimize
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    query: Option<String>,

    /// Read the statement from a file
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Configuration file (defaults to sqlmin.toml / sqlmin.local.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Planner feature to treat as unsupported (repeatable)
    #[arg(long = "unsupported", value_name = "FEATURE")]
    unsupported: Vec<PlannerFeature>,

    /// Maximum oracle calls (0 = unlimited)
    #[arg(long)]
    max_oracle_calls: Option<u64>,

    /// Whole-run timeout in milliseconds (0 = none)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Evaluate the candidates of one location in parallel
    #[arg(long)]
    parallel: bool,

    /// Print a JSON report instead of the bare statement
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("failed to load config {path}"))?
        }
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Using default configuration ({e})");
            Config::default()
        }),
    };
    if let Some(max_oracle_calls) = cli.max_oracle_calls {
        config.search.max_oracle_calls = max_oracle_calls;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.search.timeout_ms = timeout_ms;
    }
    if cli.parallel {
        config.search.parallel = true;
    }

    init_tracing(&config.logging);

    let schema = SchemaContext::load(&cli.schema)
        .with_context(|| format!("failed to load schema {}", cli.schema.display()))?;
    let text = match (&cli.query, &cli.file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("either --query or --file is required"),
    };
    let seed = parse_statement(text.trim()).context("failed to parse the statement")?;

    let planner = SchemaPlanner::new().with_unsupported_all(cli.unsupported.iter().copied());
    let Some(signature) = FailureSignature::capture(&planner, &seed, &schema)? else {
        bail!("statement plans successfully; nothing to minimize");
    };
    tracing::info!(%signature, "captured seed failure");

    let oracle = ReproductionOracle::new(&planner, &schema, signature.clone())
        .with_round_trip_check(config.oracle.check_round_trip);
    let reduction = Minimizer::from_config(&config).minimize(seed.clone(), &oracle)?;

    if cli.json {
        let report = serde_json::json!({
            "original": seed.to_string(),
            "minimized": reduction.statement.to_string(),
            "signature": signature,
            "stats": reduction.stats,
            "history": reduction.history,
            "stop": reduction.stop,
            "locally_minimal": reduction.locally_minimal,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", reduction.statement);
        if let Some(reason) = reduction.stop {
            eprintln!("warning: search stopped early: {reason}");
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let log_file = env::var("SQLMIN_LOG_FILE").ok().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| eprintln!("ERROR: Unable to open SQLMIN_LOG_FILE '{path}': {e}"))
            .ok()
    });
    let to_file = log_file.is_some();
    let (non_blocking, guard) = match log_file {
        Some(file) => tracing_appender::non_blocking(file),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };
    let _ = TRACE_GUARD.set(guard);

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(logging))
            .with_ansi(!to_file)
            .with_writer(non_blocking.clone())
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match logging.format {
        LogFormat::Json => Box::new(base().json().finish()),
        LogFormat::Text => Box::new(base().compact().finish()),
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// `SQLMIN_LOG` takes precedence over the configured level
fn env_filter(logging: &LoggingConfig) -> tracing_subscriber::EnvFilter {
    env::var("SQLMIN_LOG")
        .ok()
        .and_then(|directives| tracing_subscriber::EnvFilter::try_new(directives).ok())
        .or_else(|| tracing_subscriber::EnvFilter::try_new(&logging.level).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info"))
}
