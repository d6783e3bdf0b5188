//! Plain-text panels

use crate::market::types::{Candle, DisplayRecord};
use crate::services::{MarketView, NewsView, RecommendationsView, SummaryView, WatchlistView};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const MISSING: &str = "---";

pub const RECOMMENDATION_DISCLAIMER: &str = "Disclaimer: This is not financial advice. \
     AI-generated content may be inaccurate. Always do your own research.";

fn price(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| MISSING.to_string())
}

fn date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Header, price line and key stats for the displayed stock
pub fn render_quote_card(record: &DisplayRecord) -> String {
    let quote = &record.quote;
    let profile = record.profile.as_ref();
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", record.display_name(), record.symbol);
    if let Some(url) = profile.and_then(|p| p.web_url.as_deref()).filter(|u| !u.is_empty()) {
        let _ = writeln!(out, "{}", url);
    }

    let change = match (quote.change, quote.change_percent) {
        (Some(change), Some(percent)) => {
            let sign = if change >= 0.0 { "+" } else { "" };
            format!("{}{:.2} ({:.2}%)", sign, change, percent)
        }
        (Some(change), None) => {
            let sign = if change >= 0.0 { "+" } else { "" };
            format!("{}{:.2}", sign, change)
        }
        _ => MISSING.to_string(),
    };
    let _ = writeln!(out, "{}  {}", price(quote.current_price), change);

    let market_cap = profile
        .and_then(|p| p.market_capitalization)
        .filter(|cap| *cap != 0.0)
        .map(|cap| format!("{:.2}M", cap))
        .unwrap_or_else(|| "N/A".to_string());
    let exchange = profile
        .and_then(|p| p.exchange.clone())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "N/A".to_string());

    let stats = [
        ("Previous Close", price(quote.previous_close)),
        ("Open", price(quote.open)),
        ("Day High", price(quote.high)),
        ("Day Low", price(quote.low)),
        ("Market Cap", market_cap),
        ("Exchange", exchange),
    ];
    for (label, value) in stats {
        let _ = writeln!(out, "  {:<15}{}", label, value);
    }

    out
}

/// One-line description of the candle series
pub fn render_candles_summary(candles: Option<&[Candle]>) -> String {
    let candles = match candles {
        None => return "Chart: loading...".to_string(),
        Some([]) => return "Chart: no data available".to_string(),
        Some(candles) => candles,
    };

    let (first, last) = (&candles[0], &candles[candles.len() - 1]);
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

    format!(
        "Chart: {} daily candles {} to {}, close {:.2} -> {:.2}, range {:.2}-{:.2}",
        candles.len(),
        date(first.time),
        date(last.time),
        first.close,
        last.close,
        low,
        high
    )
}

/// Market panel: loading, error or quote card with chart line
pub fn render_market(view: &MarketView) -> String {
    if view.loading {
        return format!("Loading {}...", view.symbol.as_deref().unwrap_or_default());
    }
    if let Some(error) = &view.error {
        return format!("Error: {}", error);
    }
    match &view.display {
        Some(record) => format!(
            "{}{}",
            render_quote_card(record),
            render_candles_summary(view.candles.as_deref())
        ),
        None => "Search for a stock to get started.".to_string(),
    }
}

pub fn render_news(view: &NewsView) -> String {
    if view.loading {
        return "Latest News\n  Loading...".to_string();
    }

    let mut out = String::from("Latest News\n");
    if let Some(error) = &view.error {
        let _ = writeln!(out, "  Error: {}", error);
    }
    if view.items.is_empty() {
        out.push_str("  No recent news found.");
        return out;
    }

    for (i, item) in view.items.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}", i + 1, item.headline);
        let _ = writeln!(out, "     {} - {}", item.source, date(item.datetime));
    }
    out.trim_end().to_string()
}

pub fn render_watchlist(view: &WatchlistView) -> String {
    let mut out = String::from("My Watchlist\n");
    if view.user_id.is_none() {
        out.push_str("  Sign in to use the watchlist.");
    } else if view.loading {
        out.push_str("  Loading...");
    } else if view.entries.is_empty() {
        out.push_str("  Add stocks with `watch`.");
    } else {
        let lines: Vec<String> = view
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{:>3}. {:<8}{}", i + 1, e.symbol, e.name))
            .collect();
        out.push_str(&lines.join("\n"));
    }
    out
}

pub fn render_recommendations(view: &RecommendationsView) -> String {
    let mut out = format!("AI Stock Recommendations\n  {}\n", RECOMMENDATION_DISCLAIMER);
    if view.loading {
        out.push_str("  Analyzing Market...");
        return out;
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "  Error: {}", error);
    }
    if view.items.is_empty() {
        out.push_str("  Run `recs` to get new recommendations.");
        return out;
    }

    for (i, rec) in view.items.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {} ({})", i + 1, rec.symbol, rec.company_name);
        let _ = writeln!(out, "     {}", rec.reason);
    }
    out.trim_end().to_string()
}

pub fn render_summary(view: &SummaryView) -> String {
    let body = if view.loading {
        "Analyzing..."
    } else {
        view.text.as_deref().unwrap_or("AI analysis appears here.")
    };
    format!("AI News Analysis\n  {}", body)
}
