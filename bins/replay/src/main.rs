//! Claimflow scenario replay
//!
//! Runs a JSON approval scenario through the workflow and prints the final
//! claim state.
//!
//! Usage: cargo run --bin replay -- bins/replay/scenarios/scenario_b.json

mod scenario;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use claimflow_shared::AppConfig;

use crate::scenario::Scenario;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: replay <scenario.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {path}"))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("Invalid scenario {path}"))?;

    if let Some(description) = &scenario.description {
        info!(%path, "{description}");
    }

    let report = scenario::run(&scenario, &config).await?;
    info!(
        applied = report.applied,
        refused = report.refused,
        status = %report.approval.status(),
        "replay complete"
    );

    println!("{}", serde_json::to_string_pretty(&report.approval)?);

    Ok(())
}
