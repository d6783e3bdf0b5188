//! Market data and news types
//!
//! Field names follow the Finnhub wire format through serde renames so the
//! provider responses deserialize directly.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trailing window of daily candles
pub const CANDLE_WINDOW_DAYS: i64 = 365;

/// Trailing window of company news
pub const NEWS_WINDOW_DAYS: i64 = 30;

/// Real-time quote. Every field may be omitted by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "c")]
    pub current_price: Option<f64>,
    #[serde(rename = "d")]
    pub change: Option<f64>,
    #[serde(rename = "dp")]
    pub change_percent: Option<f64>,
    #[serde(rename = "h")]
    pub high: Option<f64>,
    #[serde(rename = "l")]
    pub low: Option<f64>,
    #[serde(rename = "o")]
    pub open: Option<f64>,
    #[serde(rename = "pc")]
    pub previous_close: Option<f64>,
    #[serde(rename = "t")]
    pub timestamp: Option<i64>,
}

impl Quote {
    /// A zero current price together with a zero previous close is how the
    /// provider answers for symbols it does not know.
    pub fn has_price_data(&self) -> bool {
        let current = self.current_price.unwrap_or(0.0);
        let previous = self.previous_close.unwrap_or(0.0);
        !(current == 0.0 && previous == 0.0)
    }
}

/// Company profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: Option<String>,
    pub ticker: Option<String>,
    /// In millions of `currency`
    pub market_capitalization: Option<f64>,
    pub exchange: Option<String>,
    #[serde(rename = "weburl")]
    pub web_url: Option<String>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub finnhub_industry: Option<String>,
    pub logo: Option<String>,
}

impl Profile {
    /// Unsupported symbols come back as `{}`
    pub fn is_empty(&self) -> bool {
        *self == Profile::default()
    }
}

/// One daily OHLC bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Column-oriented candle response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandleResponse {
    #[serde(default)]
    pub s: String,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<f64>,
    #[serde(default)]
    pub h: Vec<f64>,
    #[serde(default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub c: Vec<f64>,
}

impl CandleResponse {
    /// Normalize into rows. Anything other than `s == "ok"` with closes
    /// present yields an empty series.
    pub fn into_candles(self) -> Vec<Candle> {
        if self.s != "ok" || self.c.is_empty() {
            return Vec::new();
        }

        let len = [self.t.len(), self.o.len(), self.h.len(), self.l.len(), self.c.len()]
            .into_iter()
            .min()
            .unwrap_or(0);

        (0..len)
            .map(|i| Candle {
                time: self.t[i],
                open: self.o[i],
                high: self.h[i],
                low: self.l[i],
                close: self.c[i],
            })
            .collect()
    }
}

/// News article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub id: i64,
    pub category: String,
    /// Unix seconds
    pub datetime: i64,
    pub headline: String,
    pub image: String,
    /// Comma separated symbols the article is about
    pub related: String,
    pub source: String,
    pub summary: String,
    pub url: String,
}

impl NewsItem {
    /// First related symbol, if any
    pub fn primary_symbol(&self) -> Option<String> {
        self.related
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .find(|s| !s.is_empty())
    }
}

/// Decode a news payload. Non-array payloads and malformed entries are
/// dropped rather than treated as errors.
pub fn decode_news(payload: Value) -> Vec<NewsItem> {
    match payload {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<NewsItem>(entry) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::debug!("Skipping malformed news entry: {}", e);
                    None
                }
            })
            .collect(),
        other => {
            tracing::debug!("News payload is not an array: {}", value_kind(&other));
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Quote and profile for one symbol, as displayed together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    pub symbol: String,
    pub quote: Quote,
    pub profile: Option<Profile>,
}

impl DisplayRecord {
    /// Name used for display and for new watchlist entries
    pub fn display_name(&self) -> String {
        self.profile
            .as_ref()
            .and_then(|p| p.name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.symbol.clone())
    }
}

/// Unix-second range `(from, to)` for the trailing candle window ending at `now`
pub fn candle_window(now: DateTime<Utc>) -> (i64, i64) {
    let to = now.timestamp();
    (to - CANDLE_WINDOW_DAYS * 24 * 60 * 60, to)
}

/// Calendar date range `(from, to)` for the trailing news window ending at `now`
pub fn news_window(now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let to = now.date_naive();
    let from = (now - Duration::days(NEWS_WINDOW_DAYS)).date_naive();
    (from, to)
}
