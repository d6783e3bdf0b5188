//! Gemini `generateContent` adapter

use crate::ai::{GenerateContentRequest, GenerateContentResponse, GenerativeModel};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(base_url: Url, model: String, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.as_str().trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        debug!("Gemini generateContent - model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(AppError::Ai(format!(
                "Gemini API failed with status: {}",
                status.as_u16()
            )));
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::new(
            Url::parse("https://generativelanguage.googleapis.com/v1beta").unwrap(),
            "gemini-2.5-flash-preview-05-20".to_string(),
            SecretString::from(String::new()),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-05-20:generateContent"
        );
        assert_eq!(client.model(), "gemini-2.5-flash-preview-05-20");
    }
}
