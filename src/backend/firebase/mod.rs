//! Firebase backend
//!
//! Identity comes from Firebase Auth and documents live in Firestore, both over
//! their REST APIs. Firestore's streaming listen channel is not available over
//! plain REST, so collection subscriptions poll and are woken early by local
//! writes.

pub mod auth;
pub mod firestore;

use super::{
    CloudBackend, CollectionPath, CollectionSubscription, DocumentData, Snapshot, SnapshotEvent,
    UserIdentity,
};
use crate::config::FirebaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use auth::FirebaseAuth;
use firestore::FirestoreClient;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Firebase Auth and Firestore behind [`CloudBackend`]
pub struct FirebaseBackend {
    auth: Arc<FirebaseAuth>,
    firestore: Arc<FirestoreClient>,
    poll_interval: Duration,
    /// Bumped after every local write
    writes: watch::Sender<u64>,
}

impl FirebaseBackend {
    pub fn new(config: &FirebaseConfig, poll_interval: Duration, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            auth: Arc::new(FirebaseAuth::new(client.clone(), config.api_key.clone())),
            firestore: Arc::new(FirestoreClient::new(client, config.project_id.clone())),
            poll_interval,
            writes: watch::channel(0).0,
        })
    }
}

#[async_trait]
impl CloudBackend for FirebaseBackend {
    fn id(&self) -> &'static str {
        "firebase"
    }

    async fn establish_identity(&self, custom_token: Option<&str>) -> Result<UserIdentity> {
        match custom_token {
            Some(token) => self.auth.sign_in_with_custom_token(token).await,
            None => self.auth.sign_in_anonymously().await,
        }
    }

    fn subscribe_identity(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.auth.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out();
        Ok(())
    }

    fn subscribe_collection(&self, path: &CollectionPath) -> CollectionSubscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let poller = tokio::spawn(poll_collection(
            self.auth.clone(),
            self.firestore.clone(),
            path.clone(),
            self.poll_interval,
            self.writes.subscribe(),
            tx,
        ));

        CollectionSubscription::new(rx, Some(poller))
    }

    async fn upsert(&self, path: &CollectionPath, id: &str, data: DocumentData) -> Result<()> {
        let token = self.auth.id_token().await?;
        self.firestore.patch(&token, path, id, &data).await?;
        self.writes.send_modify(|version| *version += 1);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let token = self.auth.id_token().await?;
        self.firestore.delete(&token, path, id).await?;
        self.writes.send_modify(|version| *version += 1);
        Ok(())
    }
}

/// Poll a collection, forwarding the first snapshot and every change after it
async fn poll_collection(
    auth: Arc<FirebaseAuth>,
    firestore: Arc<FirestoreClient>,
    path: CollectionPath,
    interval: Duration,
    mut writes: watch::Receiver<u64>,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
) {
    debug!("Polling {} every {:?}", path, interval);
    let mut last: Option<Snapshot> = None;

    loop {
        let result = match auth.id_token().await {
            Ok(token) => firestore.list(&token, &path).await,
            Err(e) => Err(e),
        };

        let event = match result {
            Ok(snapshot) if last.as_ref() == Some(&snapshot) => None,
            Ok(snapshot) => {
                last = Some(snapshot.clone());
                Some(Ok(snapshot))
            }
            Err(e) => {
                warn!("Polling {} failed: {}", path, e);
                Some(Err(e))
            }
        };

        if let Some(event) = event {
            if tx.send(event).is_err() {
                break;
            }
        }

        if !next_poll(interval, &mut writes, &tx).await {
            break;
        }
    }

    debug!("Stopped polling {}", path);
}

/// Wait out the poll interval. A write since the last wait ends it early.
/// Returns false once the subscriber is gone.
async fn next_poll(
    interval: Duration,
    writes: &mut watch::Receiver<u64>,
    tx: &mpsc::UnboundedSender<SnapshotEvent>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => true,
        Ok(()) = writes.changed() => true,
        _ = tx.closed() => false,
    }
}
