//! Trade alert server
//!
//! Polls exchange position exports and news on independent cadences and
//! pushes deduplicated alerts to Discord channels.

mod settings;
mod wiring;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::ServerConfig;

/// Scheduled crypto position and news alerts
#[derive(Parser, Debug)]
#[command(name = "alert-server")]
#[command(author, version, about)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, env = "ALERTS_CONFIG", default_value = "alerts.toml")]
    config: PathBuf,

    /// Run every cadence once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = ServerConfig::load(&cli.config)
        .with_context(|| format!("Invalid configuration in {}", cli.config.display()))?;
    tracing::info!(path = %cli.config.display(), "✓ Configuration loaded");

    let scheduler = wiring::build_scheduler(&settings)?;

    if cli.once {
        let results = scheduler.run_once().await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            anyhow::bail!("{failed} of {} cycles failed", results.len());
        }
        return Ok(());
    }

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 alert-server running");
    for entry in &settings.alerts.schedule {
        tracing::info!(
            "  {:<18} every {} min (positions: {}, news: {})",
            entry.name,
            entry.every_minutes,
            entry.positions,
            entry.news
        );
    }
    tracing::info!("══════════════════════════════════════════════════");

    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;

    Ok(())
}
