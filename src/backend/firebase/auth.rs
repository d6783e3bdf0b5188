//! Firebase Auth over the Identity Toolkit REST API

use crate::backend::UserIdentity;
use crate::error::{AppError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Refresh the ID token this long before it expires
const REFRESH_MARGIN_SECS: i64 = 60;

struct AuthSession {
    id_token: SecretString,
    refresh_token: SecretString,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Auth session holder
pub struct FirebaseAuth {
    client: Client,
    api_key: SecretString,
    session: RwLock<Option<AuthSession>>,
    identity: watch::Sender<Option<UserIdentity>>,
}

impl FirebaseAuth {
    pub fn new(client: Client, api_key: SecretString) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            client,
            api_key,
            session: RwLock::new(None),
            identity,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.identity.subscribe()
    }

    /// Create an anonymous account and sign in as it
    pub async fn sign_in_anonymously(&self) -> Result<UserIdentity> {
        let response: SignInResponse = self
            .post_identity_toolkit("accounts:signUp", json!({ "returnSecureToken": true }))
            .await?;

        let uid = match response.local_id.clone() {
            Some(uid) => uid,
            None => uid_from_id_token(&response.id_token)?,
        };

        Ok(self.store_session(uid, true, response))
    }

    /// Exchange a custom token minted by a trusted server
    pub async fn sign_in_with_custom_token(&self, token: &str) -> Result<UserIdentity> {
        let response: SignInResponse = self
            .post_identity_toolkit(
                "accounts:signInWithCustomToken",
                json!({ "token": token, "returnSecureToken": true }),
            )
            .await?;

        let uid = uid_from_id_token(&response.id_token)?;
        Ok(self.store_session(uid, false, response))
    }

    pub fn sign_out(&self) {
        *self.session.write() = None;
        self.identity.send_replace(None);
        info!("Signed out");
    }

    /// Current ID token, refreshed when close to expiry
    pub async fn id_token(&self) -> Result<String> {
        let refresh_token = {
            let session = self.session.read();
            let session = session
                .as_ref()
                .ok_or_else(|| AppError::Auth("Not signed in".to_string()))?;

            if session.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(session.id_token.expose_secret().to_string());
            }
            session.refresh_token.expose_secret().to_string()
        };

        debug!("Refreshing Firebase ID token");
        let response = self
            .client
            .post(SECURE_TOKEN_URL)
            .query(&[("key", self.api_key.expose_secret())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;
        let refreshed: RefreshResponse = Self::decode(response).await?;

        let mut session = self.session.write();
        let session = session
            .as_mut()
            .ok_or_else(|| AppError::Auth("Signed out during token refresh".to_string()))?;
        session.id_token = SecretString::from(refreshed.id_token.clone());
        session.refresh_token = SecretString::from(refreshed.refresh_token);
        session.expires_at = Utc::now() + Duration::seconds(parse_expires_in(&refreshed.expires_in));

        Ok(refreshed.id_token)
    }

    fn store_session(&self, uid: String, anonymous: bool, response: SignInResponse) -> UserIdentity {
        let identity = UserIdentity { uid, anonymous };

        *self.session.write() = Some(AuthSession {
            id_token: SecretString::from(response.id_token),
            refresh_token: SecretString::from(response.refresh_token),
            expires_at: Utc::now() + Duration::seconds(parse_expires_in(&response.expires_in)),
        });

        info!("Signed in as {} (anonymous: {})", identity.uid, identity.anonymous);
        self.identity.send_replace(Some(identity.clone()));
        identity
    }

    async fn post_identity_toolkit<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", IDENTITY_TOOLKIT_URL, method))
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Decode a success body, or turn the `{"error": {"message": ..}}` envelope into an auth error
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("status {}", status.as_u16()));
        Err(AppError::Auth(message))
    }
}

fn parse_expires_in(value: &str) -> i64 {
    value.trim().parse().unwrap_or(3600)
}

/// Read the uid claim from an ID token without verifying it
pub(crate) fn uid_from_id_token(token: &str) -> Result<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AppError::Auth("Malformed ID token".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AppError::Auth(format!("Malformed ID token payload: {}", e)))?;
    let claims: Value = serde_json::from_slice(&bytes)?;

    claims
        .get("user_id")
        .or_else(|| claims.get("sub"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("ID token has no uid claim".to_string()))
}
