//! Headless tour simulator for the Panorama map controller.
//!
//! Mounts one map session against a timed, in-process stand-in for the
//! page and the rendering engine, replays a script of user actions and
//! prints a JSON report of what the session did.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `panorama-config.yaml` (or the path given as
//!    the first argument), applying `PANORAMA_API_KEY`
//! 3. Run the tour until the configured run length elapses
//! 4. Tear the session down and print the report

mod config;
mod error;
mod observer;
mod runner;
mod world;

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the tour simulator.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the report cannot
/// be serialized.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("panorama-sim starting");

    // 2. Load configuration.
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(config::CONFIG_FILE), PathBuf::from);
    let config = config::load(&path)
        .with_context(|| format!("loading {}", path.display()))?
        .with_api_key_override(std::env::var(config::API_KEY_ENV).ok());
    info!(
        path = %path.display(),
        points = config.map.points.len(),
        actions = config.simulation.actions.len(),
        script_load_ms = config.simulation.script_load_ms,
        layout_delay_ms = config.simulation.layout_delay_ms,
        "Configuration loaded"
    );

    // 3. Run the tour.
    let report = runner::run(&config).await.context("running tour")?;

    // 4. Print the report.
    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    println!("{json}");

    info!("panorama-sim finished");
    Ok(())
}
