//! tracker-replay — load a wire-format event log, sync it through an
//! in-memory remote into a fresh session, and print projections,
//! determinism hash and mood averages.
//!
//! Usage: tracker-replay <events.json> [hour|day|week|month|year]

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;

use tracker_engine::domain::Category;
use tracker_engine::events::Event;
use tracker_engine::period::Granularity;
use tracker_runtime::config::TrackerConfig;
use tracker_runtime::persistence::{persist_session, restore_session, MemoryStateStore};
use tracker_runtime::remote::MemoryRemote;
use tracker_runtime::replay::verify_determinism;
use tracker_runtime::session::{Session, SharedSession};
use tracker_runtime::sync::SyncCoordinator;
use tracker_runtime::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let config = TrackerConfig::from_env().context("reading configuration")?;
    init_tracing(&config.log_filter);

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: tracker-replay <events.json> [hour|day|week|month|year]");
    };
    let granularity: Granularity = match args.next() {
        Some(g) => g.parse().map_err(anyhow::Error::msg)?,
        None => Granularity::Day,
    };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path))?;
    let values: Vec<Value> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
    let events = values
        .into_iter()
        .enumerate()
        .map(|(i, v)| Event::from_value(v).with_context(|| format!("event #{}", i)))
        .collect::<Result<Vec<_>>>()?;
    info!(events = events.len(), path = %path, "loaded event log");

    // The file plays the part of another device's pushes.
    let remote = Arc::new(MemoryRemote::default());
    remote.seed(events.clone()).await;

    let session = SharedSession::new(Session::new(config.calendar()));
    let coordinator = SyncCoordinator::new(session.clone(), remote);
    coordinator.sync().await?;

    let store = MemoryStateStore::new();
    persist_session(&session, &store).await?;
    let reloaded = SharedSession::new(Session::new(config.calendar()));
    restore_session(&reloaded, &store).await?;

    let projections = reloaded.projections()?;
    println!("Projections:");
    for category in Category::ALL {
        println!("  {:<12} {}", category.as_str(), projections.category_len(category));
    }
    println!("  {:<12} {}", "all", projections.all.len());
    for diagnostic in &projections.diagnostics {
        println!("  [WARN] {}", diagnostic);
    }

    match verify_determinism(&events) {
        Ok(hash) => println!("\nCanonical hash: {}", hash),
        Err((first, second)) => bail!("replay is not deterministic: {} != {}", first, second),
    }

    println!("\nMean mood by {}:", granularity);
    for (period, mean) in reloaded.mean_moods_by(granularity)? {
        println!("  {}  {:.3}", period, mean);
    }
    Ok(())
}
