//! Market data provider adapters

pub mod finnhub;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use types::*;

/// Source of quotes, profiles, candles and news
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider ID (e.g., "finnhub")
    fn id(&self) -> &'static str;

    /// Current quote for a symbol
    async fn quote(&self, symbol: &str) -> Result<Quote>;

    /// Company profile, `None` when the provider has nothing for the symbol
    async fn profile(&self, symbol: &str) -> Result<Option<Profile>>;

    /// Daily candles between two unix timestamps, chronological ascending
    async fn daily_candles(&self, symbol: &str, from: i64, to: i64) -> Result<Vec<Candle>>;

    /// Company news between two dates, most recent first
    async fn company_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<NewsItem>>;

    /// General market news for a category (e.g., "general")
    async fn market_news(&self, category: &str) -> Result<Vec<NewsItem>>;
}
