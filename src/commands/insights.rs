//! AI recommendation commands

use crate::services::{FetchOutcome, InsightService};
use crate::state::AppState;

/// Regenerate stock recommendations from general market news
pub async fn refresh_recommendations(state: &AppState) -> FetchOutcome {
    InsightService::refresh_recommendations(state).await
}
