//! In-memory backend
//!
//! Process-local identity and document store with the same observable
//! behaviour as the remote one: every write pushes a full snapshot to every
//! live subscriber of the collection.

use super::*;
use crate::error::AppError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[derive(Default)]
struct CollectionState {
    documents: BTreeMap<String, DocumentData>,
    listeners: Vec<mpsc::UnboundedSender<SnapshotEvent>>,
}

impl CollectionState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            documents: self
                .documents
                .iter()
                .map(|(id, data)| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect(),
        }
    }

    fn broadcast(&mut self) {
        let snapshot = self.snapshot();
        self.listeners
            .retain(|listener| listener.send(Ok(snapshot.clone())).is_ok());
    }
}

/// In-memory identity provider and document store
pub struct InMemoryBackend {
    collections: DashMap<String, CollectionState>,
    identity: watch::Sender<Option<UserIdentity>>,
    offline: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            collections: DashMap::new(),
            identity,
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate an unreachable backend: every call fails until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Deliver an error to every subscriber of `path`
    pub fn fail_subscribers(&self, path: &CollectionPath, message: &str) {
        if let Some(mut collection) = self.collections.get_mut(path.as_str()) {
            collection
                .listeners
                .retain(|listener| listener.send(Err(AppError::Backend(message.to_string()))).is_ok());
        }
    }

    /// Number of subscribers still listening on `path`
    pub fn listener_count(&self, path: &CollectionPath) -> usize {
        self.collections
            .get(path.as_str())
            .map(|c| c.listeners.iter().filter(|l| !l.is_closed()).count())
            .unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Backend("backend unreachable".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudBackend for InMemoryBackend {
    fn id(&self) -> &'static str {
        "memory"
    }

    async fn establish_identity(&self, custom_token: Option<&str>) -> Result<UserIdentity> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Auth("identity provider unreachable".to_string()));
        }

        let identity = match custom_token {
            // The token stands in for the uid it would be minted for
            Some(token) if token.trim().is_empty() => {
                return Err(AppError::Auth("INVALID_CUSTOM_TOKEN".to_string()));
            }
            Some(token) => UserIdentity {
                uid: token.trim().to_string(),
                anonymous: false,
            },
            None => UserIdentity {
                uid: format!("anon-{}", uuid::Uuid::new_v4()),
                anonymous: true,
            },
        };

        info!("In-memory sign-in as {}", identity.uid);
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn subscribe_identity(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.identity.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        self.identity.send_replace(None);
        Ok(())
    }

    fn subscribe_collection(&self, path: &CollectionPath) -> CollectionSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut collection = self.collections.entry(path.as_str().to_string()).or_default();

        if self.offline.load(Ordering::SeqCst) {
            let _ = tx.send(Err(AppError::Backend("backend unreachable".to_string())));
        } else {
            let _ = tx.send(Ok(collection.snapshot()));
        }
        collection.listeners.push(tx);

        debug!("Subscribed to {} ({} listeners)", path, collection.listeners.len());
        CollectionSubscription::new(rx, None)
    }

    async fn upsert(&self, path: &CollectionPath, id: &str, data: DocumentData) -> Result<()> {
        self.ensure_online()?;

        let mut collection = self.collections.entry(path.as_str().to_string()).or_default();
        collection.documents.insert(id.to_string(), data);
        collection.broadcast();
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        self.ensure_online()?;

        let mut collection = self.collections.entry(path.as_str().to_string()).or_default();
        collection.documents.remove(id);
        collection.broadcast();
        Ok(())
    }
}
