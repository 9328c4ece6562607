use anyhow::{Context, Result};
use awsinv::aws::sdk_dispatch;
use awsinv::collectors::{self, CollectContext, SdkClients};
use awsinv::config::{parse_concurrency, split_list, Config};
use awsinv::engine::{CollectEngine, ExecutorRegistry, RetryPolicy};
use awsinv::store::AtomicFile;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Snapshot AWS resources into a tree of JSON files
#[derive(Parser, Debug)]
#[command(name = "awsinv", version = awsinv::VERSION, about, long_about = None)]
struct Args {
    /// Base directory for the snapshot tree
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Only run collectors whose name contains one of these (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    services: Vec<String>,

    /// Only visit regions containing one of these (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Concurrent requests per endpoint
    #[arg(short, long, value_parser = parse_concurrency)]
    concurrency: Option<usize>,

    /// Attempts per request before giving up (default: retry forever)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// AWS profile to use
    #[arg(short, long)]
    profile: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    if matches!(level, LogLevel::Off) && std::env::var_os("RUST_LOG").is_none() {
        return Ok(None);
    }

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("awsinv {} started with log level: {:?}", awsinv::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("awsinv").join("awsinv.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".awsinv").join("awsinv.log");
    }
    PathBuf::from("awsinv.log")
}

/// Effective configuration (CLI > config file > defaults)
fn effective_config(args: &Args) -> Config {
    let mut config = Config::load();

    if let Some(directory) = &args.directory {
        config.directory = directory.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if args.max_attempts.is_some() {
        config.max_attempts = args.max_attempts;
    }
    if !args.services.is_empty() {
        config.services = split_list(&args.services);
    }
    if !args.regions.is_empty() {
        config.regions = split_list(&args.regions);
    }
    if args.profile.is_some() {
        config.profile = args.profile.clone();
    }

    config
}

async fn run(config: &Config) -> Result<bool> {
    let registry = ExecutorRegistry::with_concurrency(config.concurrency)?;
    let engine = CollectEngine::new(Arc::new(registry))
        .with_retry(RetryPolicy::new().with_max_attempts(config.max_attempts));

    let sdk = sdk_dispatch::load_sdk_config(config.profile.as_deref()).await;

    let ctx = CollectContext {
        engine,
        store: AtomicFile::new(&config.directory),
        clients: Arc::new(SdkClients::new(sdk)),
        region_patterns: config.regions.clone(),
    };

    let selected = collectors::select(&config.services);
    if selected.is_empty() {
        anyhow::bail!("No collector matches {:?}", config.services);
    }

    let results = collectors::run_all(&ctx, &selected).await;

    let mut ok = true;
    for (collector, result) in &results {
        if let Err(e) = result {
            eprintln!("{} collector failed: {:#}", collector.name(), e);
            ok = false;
        }
    }

    for (endpoint, stats) in ctx.engine.registry().inspect() {
        tracing::debug!("{}: {:?}", endpoint, stats);
    }

    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let config = effective_config(&args);

    if args.save_config {
        if let Err(err) = config.save() {
            eprintln!("Failed to save config: {err:#}");
        }
    }

    match run(&config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
