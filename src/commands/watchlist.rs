//! Watchlist commands

use super::market::normalize_symbol;
use crate::error::{AppError, Result};
use crate::services::WatchlistService;
use crate::state::AppState;
use serde::Serialize;

/// Requested watchlist change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "symbol", rename_all = "lowercase")]
pub enum WatchlistChange {
    Added(String),
    Removed(String),
    /// Not signed in; nothing was written
    Ignored(String),
}

/// Add or remove the symbol currently displayed
pub fn toggle_current(state: &AppState) -> Result<WatchlistChange> {
    let display = state
        .market_view
        .borrow()
        .display
        .clone()
        .ok_or_else(|| AppError::Validation("Load a stock before adding it to the watchlist".to_string()))?;

    let symbol = display.symbol.clone();
    let watched = state.watchlist_view.borrow().contains(&symbol);

    let change = match WatchlistService::toggle(state, &symbol, &display.display_name()) {
        None => WatchlistChange::Ignored(symbol),
        Some(_) if watched => WatchlistChange::Removed(symbol),
        Some(_) => WatchlistChange::Added(symbol),
    };
    Ok(change)
}

/// Remove a symbol from the watchlist
pub fn remove(state: &AppState, input: &str) -> Result<WatchlistChange> {
    let symbol = normalize_symbol(input)?;

    Ok(match WatchlistService::remove(state, &symbol) {
        Some(_) => WatchlistChange::Removed(symbol),
        None => WatchlistChange::Ignored(symbol),
    })
}
