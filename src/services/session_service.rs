//! Session Service
//!
//! Establishes the process identity once at startup and mirrors identity
//! changes into `AppState::user_id`.

use crate::backend::UserIdentity;
use crate::error::Result;
use crate::state::AppState;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Session service for business logic
pub struct SessionService;

impl SessionService {
    /// Start forwarding identity changes, then make one sign-in attempt.
    ///
    /// A configured custom token is exchanged for an identity; otherwise an
    /// anonymous identity is requested. Failure leaves the app signed out and
    /// is only logged.
    pub async fn bootstrap(state: &Arc<AppState>) -> Option<UserIdentity> {
        state.register_task(Self::spawn_identity_forwarder(state.clone()));

        let token = state
            .config
            .initial_auth_token
            .as_ref()
            .map(|t| t.expose_secret().trim().to_string())
            .filter(|t| !t.is_empty());

        info!(
            "SessionService::bootstrap - {} sign-in via {}",
            if token.is_some() { "custom token" } else { "anonymous" },
            state.backend.id()
        );

        match state.backend.establish_identity(token.as_deref()).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Could not establish identity, continuing signed out: {}", e);
                None
            }
        }
    }

    /// Republish the backend's identity as a plain user id
    fn spawn_identity_forwarder(state: Arc<AppState>) -> JoinHandle<()> {
        let mut identity = state.backend.subscribe_identity();

        tokio::spawn(async move {
            loop {
                let uid = identity.borrow_and_update().as_ref().map(|i| i.uid.clone());
                state.user_id.send_if_modified(|current| {
                    if *current == uid {
                        return false;
                    }
                    info!("User changed: {:?}", uid);
                    *current = uid;
                    true
                });

                if identity.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    pub async fn sign_out(state: &AppState) -> Result<()> {
        info!("SessionService::sign_out");
        state.backend.sign_out().await
    }
}
