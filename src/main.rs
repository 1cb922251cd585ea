// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Campus-Compass runner
//!
//! Opens the persisted state, replays recorded location fixes through a
//! session and logs the resulting achievement progress.

use anyhow::Context;
use campus_compass::{
    config::Config,
    db::JsonFileStore,
    services::{LocationFix, Session, SessionCommand},
    time_utils::{format_utc_rfc3339, SystemClock},
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const COMMAND_QUEUE_DEPTH: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        store = %config.store_path.display(),
        trigger_radius_m = config.trigger_radius_m,
        "Starting Campus-Compass"
    );

    let store = JsonFileStore::open(&config.store_path).context("Failed to open state store")?;
    let session = Session::open(&config, Box::new(store), Arc::new(SystemClock))?;
    tracing::info!(
        destinations = session.destinations().len(),
        achievements = session.registry().len(),
        "Session loaded"
    );

    let fixes = match &config.fixes_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<Vec<LocationFix>>(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => Vec::new(),
    };

    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let task = tokio::spawn(session.run(rx, config.recalc_interval));

    tracing::info!(count = fixes.len(), "Replaying location fixes");
    for fix in fixes {
        tx.send(SessionCommand::LocationFix(fix))
            .await
            .map_err(|_| anyhow::anyhow!("Session stopped early"))?;
    }
    tx.send(SessionCommand::SetAchievementsVisible(true))
        .await
        .map_err(|_| anyhow::anyhow!("Session stopped early"))?;

    let (reply, views) = oneshot::channel();
    tx.send(SessionCommand::Snapshot(reply))
        .await
        .map_err(|_| anyhow::anyhow!("Session stopped early"))?;
    for view in views.await? {
        tracing::info!(
            key = %view.key,
            name = %view.name,
            progress = view.current_progress,
            target = view.progress_for_completion,
            complete = view.is_complete,
            "Achievement"
        );
    }

    tx.send(SessionCommand::Shutdown)
        .await
        .map_err(|_| anyhow::anyhow!("Session stopped early"))?;
    let session = task.await?;
    tracing::info!(
        completed = session.registry().iter().filter(|a| a.is_complete()).count(),
        finished_at = %format_utc_rfc3339(chrono::Utc::now()),
        "Campus-Compass finished"
    );
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("campus_compass=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
