//! Market Service
//!
//! Fetches quote, profile and daily candles for a symbol and publishes them as
//! one view model.

use super::FetchOutcome;
use crate::error::{AppError, Result};
use crate::market::types::{candle_window, Candle, DisplayRecord};
use crate::state::AppState;
use chrono::Utc;
use futures_util::future::try_join3;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Market data panel state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketView {
    pub symbol: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub display: Option<DisplayRecord>,
    /// `None` until loaded; an empty list means the provider had no data
    pub candles: Option<Vec<Candle>>,
}

/// Market service for business logic
pub struct MarketService;

impl MarketService {
    /// Fetch `symbol` and publish the result unless a newer fetch started meanwhile
    pub async fn fetch_symbol(state: &AppState, symbol: &str) -> FetchOutcome {
        info!("MarketService::fetch_symbol - {}", symbol);

        let generation = state.market_generation.begin_with(&state.market_view, |view| {
            *view = MarketView {
                symbol: Some(symbol.to_string()),
                loading: true,
                ..MarketView::default()
            };
        });

        let published = match Self::load(state, symbol).await {
            Ok((display, candles)) => {
                debug!("{}: {} candles", symbol, candles.len());
                state
                    .market_generation
                    .publish(generation, &state.market_view, |view| {
                        view.loading = false;
                        view.display = Some(display);
                        view.candles = Some(candles);
                    })
                    .then_some(FetchOutcome::Published)
            }
            Err(e) => {
                let message = e.with_market_hint();
                warn!("Market data for {} failed: {}", symbol, message);
                state
                    .market_generation
                    .publish(generation, &state.market_view, |view| {
                        view.loading = false;
                        view.error = Some(message);
                        view.display = None;
                        view.candles = None;
                    })
                    .then_some(FetchOutcome::Failed)
            }
        };

        published.unwrap_or_else(|| {
            debug!("Discarding stale market data for {}", symbol);
            FetchOutcome::Stale
        })
    }

    /// Quote, profile and candles fetched together; any failure fails the whole load
    pub async fn load(state: &AppState, symbol: &str) -> Result<(DisplayRecord, Vec<Candle>)> {
        let (from, to) = candle_window(Utc::now());

        let (quote, profile, candles) = try_join3(
            state.market.quote(symbol),
            state.market.profile(symbol),
            state.market.daily_candles(symbol, from, to),
        )
        .await?;

        if !quote.has_price_data() {
            return Err(AppError::Validation(format!(
                "No valid price data for \"{}\".",
                symbol
            )));
        }

        Ok((
            DisplayRecord {
                symbol: symbol.to_string(),
                quote,
                profile,
            },
            candles,
        ))
    }
}
