//! Entry point for the search sync service.
//!
//! Loads configuration, creates the indices and runs sync cycles until a
//! fatal error, which ends the process with a non-zero exit code.

use std::env;
use std::process::ExitCode;

use search_sync::{Dependencies, ServiceError, SyncConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run() -> Result<(), ServiceError> {
    let config = SyncConfig::from_env()?;
    let deps = Dependencies::new(&config)?;

    deps.orchestrator.prepare().await?;
    deps.orchestrator.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting search sync");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Search sync stopped");
            ExitCode::FAILURE
        }
    }
}
