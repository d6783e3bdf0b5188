//! MarketPulse - Stock Dashboard
//!
//! Searches a ticker and shows its quote, profile, daily chart and recent
//! news, an AI summary of that news, on-demand AI stock picks, and a per-user
//! watchlist kept in a cloud document store.

pub mod ai;
pub mod backend;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod market;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Context;
use config::AppConfig;
use services::{InsightService, SessionService, WatchlistService};
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber, writing to stderr
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketpulse=debug,marketpulse_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize and run the console application
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("Starting MarketPulse...");

    let config = AppConfig::load().context("Failed to load configuration")?;
    let default_symbol = config.default_symbol.clone();

    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    // Workers first so they observe the initial identity and news batch
    state.register_task(WatchlistService::spawn(state.clone()));
    state.register_task(InsightService::spawn_summary_worker(state.clone()));
    tracing::info!("Background workers started");

    SessionService::bootstrap(&state).await;

    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = commands::search(&state, &default_symbol).await {
                tracing::warn!("Initial search for {} failed: {}", default_symbol, e);
            }
        });
    }

    let result = console::run(state.clone()).await;

    state.shutdown();
    tracing::info!("MarketPulse stopped");
    result.context("Console failed")
}
