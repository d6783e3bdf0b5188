//! Selecting an entry in one of the list panels

use crate::error::{AppError, Result};
use crate::state::AppState;
use serde::Serialize;
use std::str::FromStr;

/// List panel an entry is picked from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    News,
    Watchlist,
    Recommendations,
}

impl FromStr for Panel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" | "n" => Ok(Panel::News),
            "watch" | "watchlist" | "w" => Ok(Panel::Watchlist),
            "rec" | "recs" | "recommendations" | "r" => Ok(Panel::Recommendations),
            other => Err(AppError::Validation(format!("Unknown panel: {}", other))),
        }
    }
}

/// What picking an entry leads to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Selection {
    /// Search this symbol
    Search(String),
    /// Article without a related symbol
    Link(String),
}

/// Resolve the 1-based `index`-th entry of `panel`
pub fn select(state: &AppState, panel: Panel, index: usize) -> Result<Selection> {
    let position = index
        .checked_sub(1)
        .ok_or_else(|| AppError::Validation("Entries are numbered from 1".to_string()))?;
    let missing = || AppError::NotFound(format!("No entry {} in that list", index));

    match panel {
        Panel::News => {
            let view = state.news_view.borrow();
            let item = view.items.get(position).ok_or_else(missing)?;
            Ok(match item.primary_symbol() {
                Some(symbol) => Selection::Search(symbol),
                None => Selection::Link(item.url.clone()),
            })
        }
        Panel::Watchlist => {
            let view = state.watchlist_view.borrow();
            let entry = view.entries.get(position).ok_or_else(missing)?;
            Ok(Selection::Search(entry.symbol.clone()))
        }
        Panel::Recommendations => {
            let view = state.recommendations_view.borrow();
            let item = view.items.get(position).ok_or_else(missing)?;
            Ok(Selection::Search(item.symbol.trim().to_uppercase()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Recommendation;
    use crate::market::types::NewsItem;
    use crate::services::{WatchlistEntry, WatchlistView};
    use crate::testing::{test_state, TestHarness};

    #[test]
    fn test_panel_names() {
        assert_eq!("news".parse::<Panel>().unwrap(), Panel::News);
        assert_eq!("W".parse::<Panel>().unwrap(), Panel::Watchlist);
        assert_eq!("rec".parse::<Panel>().unwrap(), Panel::Recommendations);
        assert!("charts".parse::<Panel>().is_err());
    }

    #[test]
    fn test_news_selection_prefers_related_symbol() {
        let TestHarness { state, .. } = test_state();
        state.news_view.send_modify(|view| {
            view.items = vec![
                NewsItem {
                    related: "nvda,AMD".to_string(),
                    url: "https://example.com/a".to_string(),
                    ..NewsItem::default()
                },
                NewsItem {
                    url: "https://example.com/b".to_string(),
                    ..NewsItem::default()
                },
            ];
        });

        assert_eq!(select(&state, Panel::News, 1).unwrap(), Selection::Search("NVDA".to_string()));
        assert_eq!(
            select(&state, Panel::News, 2).unwrap(),
            Selection::Link("https://example.com/b".to_string())
        );
        assert!(matches!(select(&state, Panel::News, 3), Err(AppError::NotFound(_))));
        assert!(matches!(select(&state, Panel::News, 0), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_watchlist_and_recommendation_selection() {
        let TestHarness { state, .. } = test_state();
        state.watchlist_view.send_replace(WatchlistView {
            user_id: Some("u1".to_string()),
            loading: false,
            entries: vec![WatchlistEntry {
                symbol: "MSFT".to_string(),
                name: "Microsoft".to_string(),
            }],
        });
        state.recommendations_view.send_modify(|view| {
            view.items = vec![Recommendation {
                symbol: "amzn".to_string(),
                company_name: "Amazon".to_string(),
                reason: "Retail margins improve.".to_string(),
            }];
        });

        assert_eq!(
            select(&state, Panel::Watchlist, 1).unwrap(),
            Selection::Search("MSFT".to_string())
        );
        assert_eq!(
            select(&state, Panel::Recommendations, 1).unwrap(),
            Selection::Search("AMZN".to_string())
        );
    }
}
