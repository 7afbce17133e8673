/*!
 * MyMemory translation backend, the fallback when Google fails.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{BackendTranslation, TranslationBackend, status_error};

/// Fixed trust estimate for the fallback backend
const MYMEMORY_CONFIDENCE: f64 = 0.7;

/// MyMemory replaces the translation with this banner once the quota is gone
const QUOTA_WARNING: &str = "MYMEMORY WARNING";

/// Client for the MyMemory translation API
#[derive(Debug, Clone)]
pub struct MyMemoryBackend {
    /// HTTP client for API requests
    client: Client,
    /// API endpoint URL
    endpoint: String,
    /// Optional contact address raising the anonymous quota
    email: Option<String>,
}

/// MyMemory response envelope
#[derive(Debug, Deserialize)]
pub struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    pub response_data: MyMemoryData,

    /// Numeric in success cases, sometimes a string in error cases
    #[serde(rename = "responseStatus", default)]
    pub response_status: Value,

    #[serde(rename = "responseDetails", default)]
    pub response_details: Value,
}

/// Translation payload
#[derive(Debug, Deserialize)]
pub struct MyMemoryData {
    #[serde(rename = "translatedText", default)]
    pub translated_text: Option<String>,
}

impl MyMemoryResponse {
    fn status_code(&self) -> u16 {
        match &self.response_status {
            Value::Number(n) => n.as_u64().unwrap_or(200) as u16,
            Value::String(s) => s.parse().unwrap_or(200),
            _ => 200,
        }
    }

    /// Validate the envelope and extract the translation
    pub fn into_text(self) -> Result<String, ProviderError> {
        let status = self.status_code();
        if status == 429 {
            return Err(ProviderError::RateLimitExceeded(self.response_details.to_string()));
        }
        if status != 200 {
            return Err(ProviderError::ApiError {
                status_code: status,
                message: self.response_details.to_string(),
            });
        }

        let text = self.response_data.translated_text.unwrap_or_default();
        if text.starts_with(QUOTA_WARNING) {
            return Err(ProviderError::RateLimitExceeded(text));
        }
        Ok(text)
    }
}

impl MyMemoryBackend {
    /// Create a new MyMemory backend
    pub fn new(client: Client, endpoint: impl Into<String>, email: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            email,
        }
    }

    fn request_url(&self, text: &str, source: &str, target: &str) -> Result<Url, ProviderError> {
        let langpair = format!("{}|{}", source, target);
        let mut params = vec![("q", text), ("langpair", langpair.as_str())];
        if let Some(email) = &self.email {
            params.push(("de", email.as_str()));
        }

        Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint {}: {}", self.endpoint, e)))
    }
}

#[async_trait]
impl TranslationBackend for MyMemoryBackend {
    fn name(&self) -> &str {
        "mymemory"
    }

    fn default_confidence(&self) -> f64 {
        MYMEMORY_CONFIDENCE
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<BackendTranslation, ProviderError> {
        let url = self.request_url(text, source, target)?;
        debug!("MyMemory request {} -> {} ({} chars)", source, target, text.chars().count());

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("MyMemory error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        let envelope: MyMemoryResponse = response.json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        let translated = envelope.into_text()?;

        if translated.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(self.name().to_string()));
        }

        Ok(BackendTranslation::new(translated))
    }
}
