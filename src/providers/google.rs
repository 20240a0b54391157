/*!
 * Google web translate client.
 *
 * Uses the keyless `translate_a/single` endpoint. The whole batch goes in as
 * one text and comes back as one text; any segmentation has to be recovered
 * by the caller.
 */

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{check_status, with_retry, TextTranslator};

/// Google web translate client
#[derive(Debug)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: Url,
    source_language: String,
    target_language: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GoogleTranslator {
    /// Create a client for a language pair given as ISO 639-1 codes
    pub fn new(
        endpoint: &str,
        source_language: &str,
        target_language: &str,
        max_retries: u32,
        backoff_base_ms: u64,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(&format!("{}/translate_a/single", endpoint.trim_end_matches('/')))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Google endpoint {:?}: {}", endpoint, e)))?;

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint,
            source_language: Self::google_language_code(source_language),
            target_language: Self::google_language_code(target_language),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Google expects a script-qualified code for Chinese
    pub fn google_language_code(code: &str) -> String {
        match code {
            "zh" => "zh-CN".to_string(),
            other => other.to_string(),
        }
    }

    /// Join the translated sentence chunks of a `translate_a/single` response
    pub fn parse_response(value: &serde_json::Value) -> Result<String, ProviderError> {
        let chunks = value.get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::ParseError("Missing sentence list in Google response".to_string()))?;

        Ok(chunks.iter()
            .filter_map(|chunk| chunk.get(0).and_then(|t| t.as_str()))
            .collect())
    }

    /// Translate a short fixed phrase to check the endpoint is reachable
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.translate_text("hello").await.map(|_| ())
    }
}

#[async_trait]
impl TextTranslator for GoogleTranslator {
    async fn translate_text(&self, text: &str) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let query = [
            ("client", "gtx"),
            ("sl", self.source_language.as_str()),
            ("tl", self.target_language.as_str()),
            ("dt", "t"),
        ];
        let query = &query;
        let url = self.endpoint.as_str();

        with_retry("Google Translate", self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.post(url)
                .query(query)
                .form(&[("q", text)])
                .send()
                .await?;
            let response = check_status(response, "Google Translate error").await?;
            let value: serde_json::Value = response.json().await?;
            Self::parse_response(&value)
        })
        .await
    }
}
