//! Symbol search commands

use crate::error::{AppError, Result};
use crate::services::{FetchOutcome, MarketService, NewsService};
use crate::state::AppState;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub symbol: String,
    pub market: FetchOutcome,
    pub news: FetchOutcome,
}

/// Trim and upper-case user input into a ticker symbol
pub fn normalize_symbol(input: &str) -> Result<String> {
    let symbol = input.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::Validation("Enter a stock symbol".to_string()));
    }
    Ok(symbol)
}

/// Load market data and news for a symbol
pub async fn search(state: &AppState, input: &str) -> Result<SearchResult> {
    let symbol = normalize_symbol(input)?;
    info!("search - {}", symbol);

    let (market, news) = tokio::join!(
        MarketService::fetch_symbol(state, &symbol),
        NewsService::fetch_symbol(state, &symbol)
    );

    Ok(SearchResult {
        symbol,
        market,
        news,
    })
}
