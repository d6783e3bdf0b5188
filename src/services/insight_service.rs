//! Insight Service
//!
//! AI news summary for the selected symbol and on-demand stock picks from
//! general market news.

use super::{FetchOutcome, NewsBatch};
use crate::ai::prompts::{recommendation_prompt, recommendation_schema, summary_prompt};
use crate::ai::{GenerateContentRequest, Recommendation};
use crate::error::{AppError, Result};
use crate::state::AppState;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Market headlines fed to the recommendation prompt
pub const RECOMMENDATION_HEADLINES: usize = 15;

pub const SUMMARY_EMPTY_FALLBACK: &str = "Could not generate AI summary.";
pub const SUMMARY_FAILED_FALLBACK: &str = "Failed to generate AI summary.";

const NO_MARKET_NEWS: &str = "No market news available for recommendations.";

/// AI summary panel state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryView {
    pub symbol: Option<String>,
    pub loading: bool,
    pub text: Option<String>,
}

/// Recommendations panel state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationsView {
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<Recommendation>,
}

/// Insight service for business logic
pub struct InsightService;

impl InsightService {
    /// Summarize one forwarded batch. An empty batch clears the summary.
    pub async fn summarize(state: &AppState, batch: &NewsBatch) -> FetchOutcome {
        let generation = state.summary_generation.begin_with(&state.summary_view, |view| {
            *view = SummaryView {
                symbol: Some(batch.symbol.clone()).filter(|s| !s.is_empty()),
                loading: !batch.items.is_empty(),
                text: None,
            };
        });

        if batch.items.is_empty() {
            return FetchOutcome::Published;
        }

        info!("InsightService::summarize - {} ({} headlines)", batch.symbol, batch.items.len());
        let request = GenerateContentRequest::from_prompt(summary_prompt(&batch.symbol, &batch.headlines()));

        let text = match state.ai.generate_content(request).await {
            Ok(response) => match response.first_text().map(str::trim) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => {
                    warn!("Empty AI summary for {}", batch.symbol);
                    SUMMARY_EMPTY_FALLBACK.to_string()
                }
            },
            Err(e) => {
                error!("AI summary for {} failed: {}", batch.symbol, e);
                SUMMARY_FAILED_FALLBACK.to_string()
            }
        };

        let published = state.summary_generation.publish(generation, &state.summary_view, |view| {
            view.loading = false;
            view.text = Some(text);
        });

        if published {
            FetchOutcome::Published
        } else {
            FetchOutcome::Stale
        }
    }

    /// Summarize every batch forwarded by the news service.
    ///
    /// A batch that arrives while a summary is in flight cancels it.
    pub fn spawn_summary_worker(state: Arc<AppState>) -> JoinHandle<()> {
        let mut batches = state.news_for_ai.subscribe();

        tokio::spawn(async move {
            loop {
                let batch = batches.borrow_and_update().clone();

                tokio::select! {
                    _ = Self::summarize(&state, &batch) => {
                        if batches.changed().await.is_err() {
                            break;
                        }
                    }
                    changed = batches.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        debug!("Summary for {} superseded", batch.symbol);
                    }
                }
            }
        })
    }

    /// Regenerate recommendations. A failure keeps the previous list.
    pub async fn refresh_recommendations(state: &AppState) -> FetchOutcome {
        let started = state.recommendations_view.send_if_modified(|view| {
            if view.loading {
                return false;
            }
            view.loading = true;
            view.error = None;
            true
        });
        if !started {
            debug!("Recommendations already loading");
            return FetchOutcome::Skipped;
        }

        info!("InsightService::refresh_recommendations");
        match Self::load_recommendations(state).await {
            Ok(items) => {
                info!("Received {} recommendations", items.len());
                state.recommendations_view.send_modify(|view| {
                    view.loading = false;
                    view.items = items;
                });
                FetchOutcome::Published
            }
            Err(e) => {
                error!("Recommendations failed: {}", e);
                state.recommendations_view.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(e.to_string());
                });
                FetchOutcome::Failed
            }
        }
    }

    async fn load_recommendations(state: &AppState) -> Result<Vec<Recommendation>> {
        let news = state.market.market_news("general").await?;
        let headlines: Vec<&str> = news
            .iter()
            .take(RECOMMENDATION_HEADLINES)
            .map(|n| n.headline.as_str())
            .collect();
        if headlines.is_empty() {
            return Err(AppError::Ai(NO_MARKET_NEWS.to_string()));
        }

        let request = GenerateContentRequest::from_prompt(recommendation_prompt(&headlines))
            .with_json_schema(recommendation_schema());
        let response = state.ai.generate_content(request).await?;

        let text = response
            .first_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Ai("AI model returned an empty response.".to_string()))?;

        parse_recommendations(text)
    }
}

/// Parse the model's JSON reply, tolerating a fenced code block around it
pub fn parse_recommendations(text: &str) -> Result<Vec<Recommendation>> {
    let body = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(body)
        .map_err(|e| AppError::Ai(format!("Failed to parse AI recommendations: {}", e)))
}
