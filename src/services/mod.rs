//! Services Layer
//!
//! Business logic shared by the commands layer and the background workers.
//! Services read collaborators from [`AppState`](crate::state::AppState) and
//! publish their results into its `watch` channels; failures are converted to
//! view state at the service boundary.
//!
//! # Services
//!
//! - `SessionService` - Identity bootstrap and sign-out
//! - `MarketService` - Quote, profile and candles for a symbol
//! - `NewsService` - Company news for a symbol
//! - `InsightService` - AI news summary and stock recommendations
//! - `WatchlistService` - Per-user watchlist mirror and mutations

pub mod generation;
pub mod insight_service;
pub mod market_service;
pub mod news_service;
pub mod session_service;
pub mod watchlist_service;

use serde::Serialize;

pub use generation::{Generation, RequestGeneration};
pub use insight_service::{InsightService, RecommendationsView, SummaryView};
pub use market_service::{MarketService, MarketView};
pub use news_service::{NewsBatch, NewsService, NewsView};
pub use session_service::SessionService;
pub use watchlist_service::{WatchlistEntry, WatchlistService, WatchlistView};

/// What happened to the result of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOutcome {
    /// Result published to view state
    Published,
    /// Error published to view state
    Failed,
    /// A newer request superseded this one; nothing was published
    Stale,
    /// Not started because an identical request is still running
    Skipped,
}
