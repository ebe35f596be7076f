//! Consilium — service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (env overrides applied)
//!   3. Init logger once
//!   4. Build the inference provider
//!   5. Open the report store
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Serve the intake API until shutdown

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use consilium::analysis::Orchestrator;
use consilium::error::AppError;
use consilium::http::{self, ApiState};
use consilium::llm::providers;
use consilium::store::ReportStore;
use consilium::{config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config_path = parse_cli_args()?;
    let config = config::load(config_path.as_deref())?;

    logger::init(&config.log_level)?;

    info!(
        service = %config.service_name,
        provider = %config.llm.provider,
        bind = %config.http.bind,
        "starting"
    );

    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let orchestrator = Orchestrator::new(
        provider,
        Duration::from_secs(config.analysis.specialist_timeout_seconds),
    );
    let store = ReportStore::open(&config.report_db_path())?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                shutdown.cancel();
            }
        });
    }

    http::serve(&config.http.bind, ApiState { orchestrator, store }, shutdown).await
}

/// Minimal arg parsing: `-c/--config <path>` selects an alternate config
/// file. Anything else is an error.
fn parse_cli_args() -> Result<Option<PathBuf>, AppError> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| AppError::Config(format!("{arg} requires a path argument")))?;
                config_path = Some(PathBuf::from(path));
            }
            other => {
                return Err(AppError::Config(format!("unknown argument: {other}")));
            }
        }
    }

    Ok(config_path)
}
