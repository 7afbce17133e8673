/*!
 * Mock translation backends for testing.
 *
 * Each mock follows a scripted behavior and counts the calls it receives,
 * which is how tests assert that a cache hit never reached a backend:
 * - `MockBackend::working("name")` - always succeeds
 * - `MockBackend::failing("name")` - always errors
 * - `MockBackend::empty("name")` - succeeds with blank text
 * - `MockBackend::intermittent("name", n)` - fails every n-th call
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{BackendTranslation, TranslationBackend};

/// Request as seen by a custom response generator
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Source language
    pub source_language: String,
    /// Target language
    pub target_language: String,
}

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns blank text
    Empty,
}

/// Mock backend for testing orchestration behavior
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    behavior: MockBehavior,
    confidence: f64,
    reported_confidence: Option<f64>,
    /// Shared between clones so a test can keep a handle after boxing
    request_count: Arc<AtomicUsize>,
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            confidence: 0.8,
            reported_confidence: None,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Working)
    }

    pub fn failing(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Failing)
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Empty)
    }

    pub fn intermittent(name: impl Into<String>, fail_every: usize) -> Self {
        Self::new(name, MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Set the fixed confidence estimate
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Report a confidence with every successful response
    pub fn reporting_confidence(mut self, confidence: f64) -> Self {
        self.reported_confidence = Some(confidence);
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls received so far (across clones)
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &MockRequest) -> BackendTranslation {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{} {}->{}] {}", self.name, request.source_language, request.target_language, request.text),
        };
        BackendTranslation {
            text,
            confidence: self.reported_confidence,
        }
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            behavior: self.behavior,
            confidence: self.confidence,
            reported_confidence: self.reported_confidence,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_confidence(&self) -> f64 {
        self.confidence
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<BackendTranslation, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let request = MockRequest {
            text: text.to_string(),
            source_language: source.to_string(),
            target_language: target.to_string(),
        };

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated backend failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(BackendTranslation::new(String::new())),
        }
    }
}
