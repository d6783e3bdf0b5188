//! Application configuration
//!
//! Settings come from process environment variables, optionally layered over
//! a `.env` file. Process variables always win over file values.

use crate::error::{AppError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_APP_ID: &str = "default-stock-app";
pub const DEFAULT_SYMBOL: &str = "AAPL";

/// Which document store / identity backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Firebase Auth + Firestore over REST
    Firebase,
    /// Process-local fake, nothing leaves the machine
    InMemory,
}

impl FromStr for BackendMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(BackendMode::Firebase),
            "memory" | "in-memory" | "mock" => Ok(BackendMode::InMemory),
            other => Err(AppError::Config(format!("Unknown backend mode: {}", other))),
        }
    }
}

/// Firebase web app configuration, as found in the console's `firebaseConfig`
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: SecretString,
    pub project_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFirebaseConfig {
    api_key: String,
    project_id: String,
}

impl FirebaseConfig {
    /// Parse the JSON blob exported by the Firebase console
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawFirebaseConfig = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("Invalid FIREBASE_CONFIG: {}", e)))?;

        if raw.project_id.trim().is_empty() {
            return Err(AppError::Config("FIREBASE_CONFIG has an empty projectId".to_string()));
        }

        Ok(Self {
            api_key: SecretString::from(raw.api_key),
            project_id: raw.project_id,
        })
    }
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub finnhub_api_key: SecretString,
    pub finnhub_base_url: Url,
    pub gemini_api_key: SecretString,
    pub gemini_base_url: Url,
    pub gemini_model: String,
    pub backend: BackendMode,
    pub firebase: Option<FirebaseConfig>,
    /// Namespace segment of every document path
    pub app_id: String,
    /// Pre-provisioned custom token exchanged for an identity at startup
    pub initial_auth_token: Option<SecretString>,
    pub default_symbol: String,
    pub watchlist_optimistic: bool,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load from the process environment, layered over `.env` if present
    pub fn load() -> Result<Self> {
        let path = Path::new(".env");
        if path.exists() {
            Self::load_with_env_file(path)
        } else {
            Self::from_env()
        }
    }

    /// Load from the process environment only
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from the process environment, falling back to values in `path`
    pub fn load_with_env_file(path: &Path) -> Result<Self> {
        let file_values = read_env_file(path)?;
        tracing::debug!("Loaded {} entries from {:?}", file_values.len(), path);

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_values.get(key).cloned())
        })
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let finnhub_api_key = get("FINNHUB_API_KEY").unwrap_or_else(|| {
            tracing::warn!("FINNHUB_API_KEY is not set; market data requests will be rejected");
            String::new()
        });

        let finnhub_base_url = parse_url(
            "FINNHUB_BASE_URL",
            &get("FINNHUB_BASE_URL").unwrap_or_else(|| DEFAULT_FINNHUB_BASE_URL.to_string()),
        )?;

        let gemini_api_key = get("GEMINI_API_KEY").unwrap_or_default();
        let gemini_base_url = parse_url(
            "GEMINI_BASE_URL",
            &get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        )?;
        let gemini_model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let firebase = get("FIREBASE_CONFIG")
            .map(|json| FirebaseConfig::from_json(&json))
            .transpose()?;

        let backend = match get("MARKETPULSE_BACKEND") {
            Some(mode) => mode.parse()?,
            None if firebase.is_some() => BackendMode::Firebase,
            None => BackendMode::InMemory,
        };

        if backend == BackendMode::Firebase && firebase.is_none() {
            return Err(AppError::Config(
                "MARKETPULSE_BACKEND=firebase requires FIREBASE_CONFIG".to_string(),
            ));
        }

        let default_symbol = get("MARKETPULSE_DEFAULT_SYMBOL")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

        Ok(Self {
            finnhub_api_key: SecretString::from(finnhub_api_key),
            finnhub_base_url,
            gemini_api_key: SecretString::from(gemini_api_key),
            gemini_base_url,
            gemini_model,
            backend,
            firebase,
            app_id: get("MARKETPULSE_APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            initial_auth_token: get("MARKETPULSE_AUTH_TOKEN").map(SecretString::from),
            default_symbol,
            watchlist_optimistic: parse_bool(
                "MARKETPULSE_WATCHLIST_OPTIMISTIC",
                get("MARKETPULSE_WATCHLIST_OPTIMISTIC"),
                false,
            )?,
            poll_interval: Duration::from_millis(parse_u64(
                "MARKETPULSE_POLL_INTERVAL_MS",
                get("MARKETPULSE_POLL_INTERVAL_MS"),
                2000,
            )?),
            http_timeout: Duration::from_secs(parse_u64(
                "MARKETPULSE_HTTP_TIMEOUT_SECS",
                get("MARKETPULSE_HTTP_TIMEOUT_SECS"),
                30,
            )?),
        })
    }

    /// Offline configuration for tests
    #[cfg(test)]
    pub fn new_for_testing() -> Self {
        Self {
            finnhub_api_key: SecretString::from(String::new()),
            finnhub_base_url: Url::parse(DEFAULT_FINNHUB_BASE_URL).expect("valid default url"),
            gemini_api_key: SecretString::from(String::new()),
            gemini_base_url: Url::parse(DEFAULT_GEMINI_BASE_URL).expect("valid default url"),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            backend: BackendMode::InMemory,
            firebase: None,
            app_id: DEFAULT_APP_ID.to_string(),
            initial_auth_token: None,
            default_symbol: DEFAULT_SYMBOL.to_string(),
            watchlist_optimistic: false,
            poll_interval: Duration::from_millis(2000),
            http_timeout: Duration::from_secs(30),
        }
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;

    let mut values = HashMap::new();
    for item in iter {
        let (key, value) =
            item.map_err(|e| AppError::Config(format!("Invalid line in {:?}: {}", path, e)))?;
        values.insert(key, value);
    }
    Ok(values)
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| AppError::Config(format!("{} is not a valid URL: {}", key, e)))
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{} must be a boolean, got {}", key, v))),
        },
    }
}

fn parse_u64(key: &str, value: Option<String>, default: u64) -> Result<u64> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a positive integer, got {}", key, v))),
    }
}
