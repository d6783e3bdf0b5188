//! Watchlist Service
//!
//! Mirrors the signed-in user's watchlist collection into
//! `AppState::watchlist_view` and issues fire-and-forget writes. The document
//! store is the source of truth: every snapshot replaces local state.

use crate::backend::{CollectionPath, DocumentData, Snapshot};
use crate::state::AppState;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One watched symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub name: String,
}

/// Watchlist panel state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WatchlistView {
    pub user_id: Option<String>,
    /// True until the first snapshot or error after subscribing
    pub loading: bool,
    pub entries: Vec<WatchlistEntry>,
}

impl WatchlistView {
    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.iter().any(|e| e.symbol == symbol)
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }
}

/// Watchlist service for business logic
pub struct WatchlistService;

impl WatchlistService {
    /// Follow the current user, keeping one live subscription per identity
    pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
        let mut users = state.user_id.subscribe();

        tokio::spawn(async move {
            loop {
                let current = users.borrow_and_update().clone();
                let Some(uid) = current else {
                    state.watchlist_view.send_replace(WatchlistView::default());
                    if users.changed().await.is_err() {
                        break;
                    }
                    continue;
                };

                let path = CollectionPath::watchlist(&state.config.app_id, &uid);
                info!("Subscribing to {}", path);
                state.watchlist_view.send_replace(WatchlistView {
                    user_id: Some(uid.clone()),
                    loading: true,
                    entries: Vec::new(),
                });

                let mut subscription = state.backend.subscribe_collection(&path);
                loop {
                    tokio::select! {
                        changed = users.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            break;
                        }
                        event = subscription.next() => match event {
                            Some(Ok(snapshot)) => Self::apply_snapshot(&state, snapshot),
                            Some(Err(e)) => {
                                warn!("Watchlist subscription error on {}: {}", path, e);
                                state.watchlist_view.send_if_modified(|view| {
                                    let was_loading = view.loading;
                                    view.loading = false;
                                    was_loading
                                });
                            }
                            None => {
                                warn!("Watchlist subscription on {} closed", path);
                                if users.changed().await.is_err() {
                                    return;
                                }
                                break;
                            }
                        },
                    }
                }

                drop(subscription);
                debug!("Unsubscribed from {}", path);
            }
        })
    }

    fn apply_snapshot(state: &AppState, snapshot: Snapshot) {
        let entries: Vec<WatchlistEntry> = snapshot
            .documents
            .into_iter()
            .map(|doc| {
                let name = doc
                    .data
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(&doc.id)
                    .to_string();
                WatchlistEntry { symbol: doc.id, name }
            })
            .collect();

        debug!("Watchlist snapshot: {} entries", entries.len());
        state.watchlist_view.send_modify(|view| {
            view.loading = false;
            view.entries = entries;
        });
    }

    fn collection(state: &AppState) -> Option<CollectionPath> {
        state
            .user_id
            .borrow()
            .as_deref()
            .map(|uid| CollectionPath::watchlist(&state.config.app_id, uid))
    }

    /// Create or overwrite `symbol` with `name`.
    ///
    /// Returns the handle of the background write, or `None` when signed out.
    pub fn add(state: &AppState, symbol: &str, name: &str) -> Option<JoinHandle<()>> {
        let Some(path) = Self::collection(state) else {
            warn!("Ignoring watchlist add for {}: not signed in", symbol);
            return None;
        };
        info!("WatchlistService::add - {}", symbol);

        if state.config.watchlist_optimistic {
            state.watchlist_view.send_modify(|view| {
                view.entries.retain(|e| e.symbol != symbol);
                view.entries.push(WatchlistEntry {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                });
            });
        }

        let mut data = DocumentData::new();
        data.insert("name".to_string(), Value::String(name.to_string()));

        let backend = state.backend.clone();
        let symbol = symbol.to_string();
        Some(tokio::spawn(async move {
            if let Err(e) = backend.upsert(&path, &symbol, data).await {
                error!("Failed to add {} to watchlist: {}", symbol, e);
            }
        }))
    }

    /// Delete `symbol`. Returns the handle of the background write, or `None` when signed out.
    pub fn remove(state: &AppState, symbol: &str) -> Option<JoinHandle<()>> {
        let Some(path) = Self::collection(state) else {
            warn!("Ignoring watchlist remove for {}: not signed in", symbol);
            return None;
        };
        info!("WatchlistService::remove - {}", symbol);

        if state.config.watchlist_optimistic {
            state
                .watchlist_view
                .send_modify(|view| view.entries.retain(|e| e.symbol != symbol));
        }

        let backend = state.backend.clone();
        let symbol = symbol.to_string();
        Some(tokio::spawn(async move {
            if let Err(e) = backend.delete(&path, &symbol).await {
                error!("Failed to remove {} from watchlist: {}", symbol, e);
            }
        }))
    }

    /// Remove `symbol` if it is watched, add it otherwise
    pub fn toggle(state: &AppState, symbol: &str, name: &str) -> Option<JoinHandle<()>> {
        if state.watchlist_view.borrow().contains(symbol) {
            Self::remove(state, symbol)
        } else {
            Self::add(state, symbol, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CloudBackend;
    use crate::services::SessionService;
    use crate::testing::{test_state, test_state_with, TestHarness};
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for_view<F>(state: &AppState, predicate: F) -> WatchlistView
    where
        F: FnMut(&WatchlistView) -> bool,
    {
        let mut rx = state.watchlist_view.subscribe();
        let view = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("watchlist view did not settle")
            .unwrap()
            .clone();
        view
    }

    fn name(value: &str) -> DocumentData {
        let mut data = DocumentData::new();
        data.insert("name".to_string(), json!(value));
        data
    }

    async fn signed_in(harness: &TestHarness) -> CollectionPath {
        let state = &harness.state;
        state.register_task(WatchlistService::spawn(state.clone()));
        let identity = SessionService::bootstrap(state).await.unwrap();
        wait_for_view(state, |v| v.user_id.is_some() && !v.loading).await;
        CollectionPath::watchlist(&state.config.app_id, &identity.uid)
    }

    #[tokio::test]
    async fn test_snapshot_replaces_local_state() {
        let harness = test_state();
        let path = signed_in(&harness).await;
        let TestHarness { state, backend, .. } = &harness;

        backend.upsert(&path, "AAPL", name("Apple Inc")).await.unwrap();
        backend.upsert(&path, "MSFT", name("Microsoft")).await.unwrap();
        wait_for_view(state, |v| v.symbols() == vec!["AAPL", "MSFT"]).await;

        WatchlistService::remove(state, "AAPL").unwrap().await.unwrap();
        let view = wait_for_view(state, |v| v.symbols() == vec!["MSFT"]).await;
        assert_eq!(view.entries[0].name, "Microsoft");
    }

    #[tokio::test]
    async fn test_add_then_remove_converges() {
        let harness = test_state();
        let path = signed_in(&harness).await;
        let TestHarness { state, backend, .. } = &harness;

        backend.upsert(&path, "AAPL", name("Apple Inc")).await.unwrap();
        wait_for_view(state, |v| v.symbols() == vec!["AAPL"]).await;

        WatchlistService::add(state, "TSLA", "Tesla Inc").unwrap().await.unwrap();
        WatchlistService::remove(state, "TSLA").unwrap().await.unwrap();

        let view = wait_for_view(state, |v| v.symbols() == vec!["AAPL"]).await;
        assert!(!view.contains("TSLA"));
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let harness = test_state();
        signed_in(&harness).await;
        let state = &harness.state;

        WatchlistService::toggle(state, "NVDA", "NVIDIA Corp").unwrap().await.unwrap();
        let view = wait_for_view(state, |v| v.contains("NVDA")).await;
        assert_eq!(view.entries[0].name, "NVIDIA Corp");

        WatchlistService::toggle(state, "NVDA", "NVIDIA Corp").unwrap().await.unwrap();
        wait_for_view(state, |v| v.entries.is_empty()).await;
    }

    #[tokio::test]
    async fn test_sign_out_tears_down_subscription() {
        let harness = test_state();
        let path = signed_in(&harness).await;
        let TestHarness { state, backend, .. } = &harness;

        backend.upsert(&path, "AAPL", name("Apple Inc")).await.unwrap();
        wait_for_view(state, |v| v.contains("AAPL")).await;
        assert_eq!(backend.listener_count(&path), 1);

        SessionService::sign_out(state).await.unwrap();
        let view = wait_for_view(state, |v| v.user_id.is_none()).await;

        assert!(view.entries.is_empty());
        assert_eq!(backend.listener_count(&path), 0);
    }

    #[tokio::test]
    async fn test_mutations_without_identity_are_ignored() {
        let TestHarness { state, .. } = test_state();

        assert!(WatchlistService::add(&state, "AAPL", "Apple Inc").is_none());
        assert!(WatchlistService::remove(&state, "AAPL").is_none());
        assert!(state.watchlist_view.borrow().entries.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_error_keeps_last_state() {
        let harness = test_state();
        let path = signed_in(&harness).await;
        let TestHarness { state, backend, .. } = &harness;

        backend.upsert(&path, "AAPL", name("Apple Inc")).await.unwrap();
        wait_for_view(state, |v| v.contains("AAPL")).await;

        backend.fail_subscribers(&path, "permission denied");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(state.watchlist_view.borrow().symbols(), vec!["AAPL"]);
    }

    #[tokio::test]
    async fn test_optimistic_mutation_applies_immediately() {
        let harness = test_state_with(|config| config.watchlist_optimistic = true);
        signed_in(&harness).await;
        let state = &harness.state;
        harness.backend.set_offline(true);

        let write = WatchlistService::add(state, "AMD", "Advanced Micro Devices").unwrap();
        assert!(state.watchlist_view.borrow().contains("AMD"));
        write.await.unwrap();
    }
}
