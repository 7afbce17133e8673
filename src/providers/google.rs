/*!
 * Google Translate backend over the free web endpoint.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{BackendTranslation, TranslationBackend, status_error};

/// Fixed trust estimate for the primary backend
const GOOGLE_CONFIDENCE: f64 = 0.8;

/// Client for the public Google translate endpoint (`client=gtx`)
#[derive(Debug, Clone)]
pub struct GoogleBackend {
    /// HTTP client for API requests
    client: Client,
    /// API endpoint URL
    endpoint: String,
}

impl GoogleBackend {
    /// Create a new Google backend
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn request_url(&self, text: &str, source: &str, target: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint {}: {}", self.endpoint, e)))
    }

    /// Join the translated segments of a response
    ///
    /// The payload is a nested array; the first element lists segments
    /// whose first element is the translated piece.
    pub fn extract_text(payload: &Value) -> Result<String, ProviderError> {
        let segments = payload
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("missing translation segments".to_string()))?;

        let text: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();

        Ok(text)
    }
}

#[async_trait]
impl TranslationBackend for GoogleBackend {
    fn name(&self) -> &str {
        "google"
    }

    fn default_confidence(&self) -> f64 {
        GOOGLE_CONFIDENCE
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<BackendTranslation, ProviderError> {
        let url = self.request_url(text, source, target)?;
        debug!("Google translate request {} -> {} ({} chars)", source, target, text.chars().count());

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google translate error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        let payload: Value = response.json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        let translated = Self::extract_text(&payload)?;

        if translated.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(self.name().to_string()));
        }

        Ok(BackendTranslation::new(translated))
    }
}
