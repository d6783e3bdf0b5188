//! Application state management

use crate::ai::gemini::GeminiClient;
use crate::ai::GenerativeModel;
use crate::backend::{CloudBackend, FirebaseBackend, InMemoryBackend};
use crate::config::{AppConfig, BackendMode};
use crate::error::{AppError, Result};
use crate::market::finnhub::FinnhubClient;
use crate::market::MarketDataProvider;
use crate::services::{
    MarketView, NewsBatch, NewsView, RecommendationsView, RequestGeneration, SummaryView,
    WatchlistView,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Application state shared by services, commands and the view
pub struct AppState {
    pub config: AppConfig,

    /// Quotes, profiles, candles and news
    pub market: Arc<dyn MarketDataProvider>,

    /// Generative text model
    pub ai: Arc<dyn GenerativeModel>,

    /// Identity provider and document store
    pub backend: Arc<dyn CloudBackend>,

    pub market_view: watch::Sender<MarketView>,
    pub news_view: watch::Sender<NewsView>,

    /// Latest headlines for the summary worker
    pub news_for_ai: watch::Sender<NewsBatch>,

    pub summary_view: watch::Sender<SummaryView>,
    pub recommendations_view: watch::Sender<RecommendationsView>,
    pub watchlist_view: watch::Sender<WatchlistView>,

    /// Signed-in user id, `None` while signed out
    pub user_id: watch::Sender<Option<String>>,

    pub market_generation: RequestGeneration,
    pub news_generation: RequestGeneration,
    pub summary_generation: RequestGeneration,

    /// Background tasks aborted on shutdown
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppState {
    /// Build the provider clients and backend selected by `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let market = Arc::new(FinnhubClient::new(
            config.finnhub_base_url.clone(),
            config.finnhub_api_key.clone(),
            config.http_timeout,
        )?);

        let ai = Arc::new(GeminiClient::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
            config.http_timeout,
        )?);

        let backend: Arc<dyn CloudBackend> = match config.backend {
            BackendMode::Firebase => {
                let firebase = config.firebase.as_ref().ok_or_else(|| {
                    AppError::Config("Firebase backend selected without FIREBASE_CONFIG".to_string())
                })?;
                Arc::new(FirebaseBackend::new(
                    firebase,
                    config.poll_interval,
                    config.http_timeout,
                )?)
            }
            BackendMode::InMemory => Arc::new(InMemoryBackend::new()),
        };

        tracing::info!(
            "Providers: market={}, ai={}, backend={}",
            market.id(),
            ai.model(),
            backend.id()
        );

        Ok(Self::with_providers(config, market, ai, backend))
    }

    /// Assemble state around already constructed collaborators
    pub fn with_providers(
        config: AppConfig,
        market: Arc<dyn MarketDataProvider>,
        ai: Arc<dyn GenerativeModel>,
        backend: Arc<dyn CloudBackend>,
    ) -> Self {
        Self {
            config,
            market,
            ai,
            backend,
            market_view: watch::channel(MarketView::default()).0,
            news_view: watch::channel(NewsView::default()).0,
            news_for_ai: watch::channel(NewsBatch::default()).0,
            summary_view: watch::channel(SummaryView::default()).0,
            recommendations_view: watch::channel(RecommendationsView::default()).0,
            watchlist_view: watch::channel(WatchlistView::default()).0,
            user_id: watch::channel(None).0,
            market_generation: RequestGeneration::new(),
            news_generation: RequestGeneration::new(),
            summary_generation: RequestGeneration::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Keep a background task alive until shutdown
    pub fn register_task(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Abort every background task
    pub fn shutdown(&self) {
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        tracing::info!("Stopping {} background tasks", tasks.len());
        for task in tasks {
            task.abort();
        }
    }

    /// Number of background tasks still running
    #[cfg(test)]
    pub fn running_tasks(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, TestHarness};

    #[test]
    fn test_new_builds_in_memory_backend() {
        let state = AppState::new(AppConfig::new_for_testing()).unwrap();
        assert_eq!(state.backend.id(), "memory");
        assert_eq!(state.market.id(), "finnhub");
        assert!(state.user_id.borrow().is_none());
    }

    #[test]
    fn test_firebase_mode_requires_config() {
        let mut config = AppConfig::new_for_testing();
        config.backend = BackendMode::Firebase;
        assert!(matches!(AppState::new(config), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_tasks() {
        let TestHarness { state, .. } = test_state();
        state.register_task(tokio::spawn(std::future::pending::<()>()));
        assert_eq!(state.running_tasks(), 1);

        state.shutdown();
        tokio::task::yield_now().await;
        assert_eq!(state.running_tasks(), 0);
    }
}
