/*!
 * Translation backend implementations.
 *
 * Every backend is reached through the same [`TranslationBackend`] trait,
 * so the orchestrator only ever sees an ordered list of trait objects:
 * - `google`: public Google translate endpoint (primary)
 * - `mymemory`: MyMemory translation memory API (fallback)
 * - `mock`: scripted backend for tests
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app_config::{BackendKind, TranslationConfig};
use crate::errors::ProviderError;

/// Text produced by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendTranslation {
    /// The translated text
    pub text: String,
    /// Confidence reported by the backend, when it reports one
    pub confidence: Option<f64>,
}

impl BackendTranslation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Common trait for all translation backends
///
/// Implementations must not retry internally; the orchestrator owns the
/// fallback policy.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Stable backend identifier recorded as `backend_used`
    fn name(&self) -> &str;

    /// Confidence attached to results when the backend reports none
    ///
    /// This is a fixed trust estimate per backend, not a measured accuracy.
    fn default_confidence(&self) -> f64;

    /// Translate `text` from `source` to `target` (ISO 639-1 codes)
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<BackendTranslation, ProviderError>;
}

/// Build the configured backends in priority order
pub fn build_backends(config: &TranslationConfig) -> Vec<Arc<dyn TranslationBackend>> {
    let client = http_client(config.timeout_secs);

    config
        .backends
        .iter()
        .map(|kind| -> Arc<dyn TranslationBackend> {
            match kind {
                BackendKind::Google => Arc::new(google::GoogleBackend::new(
                    client.clone(),
                    config.google_endpoint.clone(),
                )),
                BackendKind::MyMemory => Arc::new(mymemory::MyMemoryBackend::new(
                    client.clone(),
                    config.mymemory_endpoint.clone(),
                    config.mymemory_email.clone(),
                )),
            }
        })
        .collect()
}

/// Shared HTTP client with the configured timeout
pub fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Map a non-success HTTP status to a provider error
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    if status.as_u16() == 429 {
        ProviderError::RateLimitExceeded(body)
    } else {
        ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body,
        }
    }
}

pub mod google;
pub mod mymemory;
pub mod mock;
