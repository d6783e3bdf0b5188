//! Identity and document store backends
//!
//! Both backends implement [`CloudBackend`]. Which one is built is decided by
//! [`crate::config::BackendMode`] when the application state is constructed.

pub mod firebase;
pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use firebase::FirebaseBackend;
pub use memory::InMemoryBackend;

/// Field map of a stored document
pub type DocumentData = serde_json::Map<String, serde_json::Value>;

/// Item delivered on a collection subscription
pub type SnapshotEvent = Result<Snapshot>;

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub uid: String,
    pub anonymous: bool,
}

/// Slash separated collection path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().trim_matches('/').to_string())
    }

    /// `artifacts/{app_id}/users/{uid}/watchlist`
    pub fn watchlist(app_id: &str, uid: &str) -> Self {
        Self(format!("artifacts/{}/users/{}/watchlist", app_id, uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of document `id` inside this collection
    pub fn document(&self, id: &str) -> String {
        format!("{}/{}", self.0, id)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One document in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
}

/// Full contents of a collection at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    #[cfg(test)]
    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }
}

/// Live subscription to a collection
///
/// Dropping the subscription unsubscribes. A background poller, when the
/// backend needs one, is aborted at the same time.
pub struct CollectionSubscription {
    events: mpsc::UnboundedReceiver<SnapshotEvent>,
    poller: Option<JoinHandle<()>>,
}

impl CollectionSubscription {
    pub fn new(events: mpsc::UnboundedReceiver<SnapshotEvent>, poller: Option<JoinHandle<()>>) -> Self {
        Self { events, poller }
    }

    /// Next snapshot or error, `None` once the backend stops delivering
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }
}

impl Drop for CollectionSubscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// Capability interface over the identity provider and document store
#[async_trait]
pub trait CloudBackend: Send + Sync {
    /// Backend ID (e.g., "firebase", "memory")
    fn id(&self) -> &'static str;

    /// Sign in with a custom token, or anonymously when none is given
    async fn establish_identity(&self, custom_token: Option<&str>) -> Result<UserIdentity>;

    /// Identity changes; the current value is available immediately
    fn subscribe_identity(&self) -> watch::Receiver<Option<UserIdentity>>;

    /// Drop the current identity
    async fn sign_out(&self) -> Result<()>;

    /// Live snapshots of a collection, starting with its current contents
    fn subscribe_collection(&self, path: &CollectionPath) -> CollectionSubscription;

    /// Create or overwrite document `id`
    async fn upsert(&self, path: &CollectionPath, id: &str, data: DocumentData) -> Result<()>;

    /// Delete document `id`; deleting a missing document is not an error
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchlist_path() {
        let path = CollectionPath::watchlist("default-stock-app", "user-1");
        assert_eq!(path.as_str(), "artifacts/default-stock-app/users/user-1/watchlist");
        assert_eq!(
            path.document("AAPL"),
            "artifacts/default-stock-app/users/user-1/watchlist/AAPL"
        );
    }

    #[test]
    fn test_path_trims_slashes() {
        assert_eq!(CollectionPath::new("/a/b/").to_string(), "a/b");
    }
}
