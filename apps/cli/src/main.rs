mod config;
mod document;
mod errors;
mod layout;
mod pipeline;
mod proofing;
mod render;
mod report;
mod state;

use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load configuration first so the log level can come from it
    let config = Config::load()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("resume-fit v{}", env!("CARGO_PKG_VERSION"));

    match pipeline::execute(config).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            e.log();
            Ok(ExitCode::FAILURE)
        }
    }
}
