//! News Service
//!
//! Fetches recent company news for a symbol, keeps the latest items for
//! display and forwards the top few to the summary worker.

use super::FetchOutcome;
use crate::market::types::{news_window, NewsItem};
use crate::state::AppState;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Items kept for display
pub const DISPLAY_LIMIT: usize = 10;

/// Items forwarded to the summary worker
pub const FORWARD_LIMIT: usize = 5;

/// News panel state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsView {
    pub symbol: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<NewsItem>,
}

/// Headlines handed to the summary worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsBatch {
    pub symbol: String,
    pub items: Vec<NewsItem>,
}

impl NewsBatch {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            items: Vec::new(),
        }
    }

    pub fn headlines(&self) -> Vec<&str> {
        self.items.iter().map(|n| n.headline.as_str()).collect()
    }
}

/// News service for business logic
pub struct NewsService;

impl NewsService {
    /// Fetch the trailing month of news for `symbol`
    pub async fn fetch_symbol(state: &AppState, symbol: &str) -> FetchOutcome {
        info!("NewsService::fetch_symbol - {}", symbol);

        let generation = state.news_generation.begin_with(&state.news_view, |view| {
            *view = NewsView {
                symbol: Some(symbol.to_string()),
                loading: true,
                ..NewsView::default()
            };
        });
        state
            .news_generation
            .publish(generation, &state.news_for_ai, |batch| *batch = NewsBatch::empty(symbol));

        let (from, to) = news_window(Utc::now());
        match state.market.company_news(symbol, from, to).await {
            Ok(items) => {
                let items: Vec<NewsItem> = items.into_iter().take(DISPLAY_LIMIT).collect();
                let forward = NewsBatch {
                    symbol: symbol.to_string(),
                    items: items.iter().take(FORWARD_LIMIT).cloned().collect(),
                };
                debug!("{}: {} news items, forwarding {}", symbol, items.len(), forward.items.len());

                let published = state.news_generation.publish(generation, &state.news_view, |view| {
                    view.loading = false;
                    view.items = items;
                });
                if !published {
                    return FetchOutcome::Stale;
                }

                state
                    .news_generation
                    .publish(generation, &state.news_for_ai, |batch| *batch = forward);
                FetchOutcome::Published
            }
            Err(e) => {
                warn!("News for {} failed: {}", symbol, e);
                let message = e.to_string();
                let published = state.news_generation.publish(generation, &state.news_view, |view| {
                    view.loading = false;
                    view.error = Some(message);
                });

                if published {
                    FetchOutcome::Failed
                } else {
                    FetchOutcome::Stale
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{news_payload, test_state, TestHarness};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_display_and_forward_limits() {
        let TestHarness { state, market, .. } = test_state();
        market.set_news("AAPL", news_payload(14));

        assert_eq!(NewsService::fetch_symbol(&state, "AAPL").await, FetchOutcome::Published);

        let view = state.news_view.borrow().clone();
        assert_eq!(view.items.len(), DISPLAY_LIMIT);
        assert_eq!(view.items[0].headline, "Headline 0");

        let batch = state.news_for_ai.borrow().clone();
        assert_eq!(batch.symbol, "AAPL");
        assert_eq!(batch.headlines(), vec!["Headline 0", "Headline 1", "Headline 2", "Headline 3", "Headline 4"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_forwards_empty_batch() {
        let TestHarness { state, market, .. } = test_state();
        state.news_for_ai.send_replace(NewsBatch {
            symbol: "OLD".to_string(),
            items: vec![NewsItem::default()],
        });
        market.set_news("AAPL", json!({ "error": "unexpected" }));

        assert_eq!(NewsService::fetch_symbol(&state, "AAPL").await, FetchOutcome::Published);

        assert!(state.news_view.borrow().error.is_none());
        assert_eq!(*state.news_for_ai.borrow(), NewsBatch::empty("AAPL"));
    }

    #[tokio::test]
    async fn test_transport_failure_sets_error_and_forwards_nothing() {
        let TestHarness { state, market, .. } = test_state();
        market.fail_news("AAPL", "Failed to fetch news (status: 429)");

        assert_eq!(NewsService::fetch_symbol(&state, "AAPL").await, FetchOutcome::Failed);
        assert_eq!(
            state.news_view.borrow().error.as_deref(),
            Some("Failed to fetch news (status: 429)")
        );
        assert!(state.news_for_ai.borrow().items.is_empty());
    }

    #[tokio::test]
    async fn test_stale_news_does_not_overwrite_newer_symbol() {
        let TestHarness { state, market, .. } = test_state();
        market.set_news("AAPL", news_payload(3));
        market.set_news("MSFT", news_payload(2));
        let release_aapl = market.gate_news("AAPL");

        let first = tokio::spawn({
            let state = Arc::clone(&state);
            async move { NewsService::fetch_symbol(&state, "AAPL").await }
        });
        while market.news_calls("AAPL") == 0 {
            tokio::task::yield_now().await;
        }

        NewsService::fetch_symbol(&state, "MSFT").await;
        release_aapl.send(()).unwrap();
        assert_eq!(first.await.unwrap(), FetchOutcome::Stale);

        assert_eq!(state.news_view.borrow().symbol.as_deref(), Some("MSFT"));
        assert_eq!(state.news_for_ai.borrow().symbol, "MSFT");
        assert_eq!(state.news_for_ai.borrow().items.len(), 2);
    }
}
