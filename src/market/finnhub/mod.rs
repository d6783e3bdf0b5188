//! Finnhub REST adapter

use crate::error::{AppError, Result};
use crate::market::types::*;
use crate::market::MarketDataProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Finnhub market data client
pub struct FinnhubClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl FinnhubClient {
    pub fn new(base_url: Url, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Issue a GET and reject non-success statuses with a message built by `on_failure`
    async fn get<F>(&self, path: &str, params: &[(&str, String)], on_failure: F) -> Result<Response>
    where
        F: FnOnce(StatusCode) -> String,
    {
        debug!("Finnhub GET /{}", path);

        let response = self
            .client
            .get(self.endpoint(path))
            .query(params)
            .query(&[("token", self.api_key.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider(on_failure(status)));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let response = self
            .get(path, params, |status| {
                format!("Request to /{} failed (status: {}).", path, status.as_u16())
            })
            .await?;

        Ok(response.json::<T>().await?)
    }

    /// Read a news body leniently: anything that is not JSON decodes as empty
    async fn read_news(response: Response) -> Result<Vec<NewsItem>> {
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(payload) => Ok(decode_news(payload)),
            Err(e) => {
                warn!("News response is not valid JSON: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubClient {
    fn id(&self) -> &'static str {
        "finnhub"
    }

    async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.get_json("quote", &[("symbol", symbol.to_string())]).await
    }

    async fn profile(&self, symbol: &str) -> Result<Option<Profile>> {
        let profile: Profile = self
            .get_json("stock/profile2", &[("symbol", symbol.to_string())])
            .await?;

        Ok(if profile.is_empty() { None } else { Some(profile) })
    }

    async fn daily_candles(&self, symbol: &str, from: i64, to: i64) -> Result<Vec<Candle>> {
        let response: CandleResponse = self
            .get_json(
                "stock/candle",
                &[
                    ("symbol", symbol.to_string()),
                    ("resolution", "D".to_string()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                ],
            )
            .await?;

        Ok(response.into_candles())
    }

    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>> {
        let response = self
            .get(
                "company-news",
                &[
                    ("symbol", symbol.to_string()),
                    ("from", from.format("%Y-%m-%d").to_string()),
                    ("to", to.format("%Y-%m-%d").to_string()),
                ],
                |status| format!("Failed to fetch news (status: {})", status.as_u16()),
            )
            .await?;

        Self::read_news(response).await
    }

    async fn market_news(&self, category: &str) -> Result<Vec<NewsItem>> {
        let response = self
            .get("news", &[("category", category.to_string())], |_| {
                "Failed to fetch market news.".to_string()
            })
            .await?;

        Self::read_news(response).await
    }
}
