use crate::config::AuditConfig;
use crate::error::AuditError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Abstract interface for a text-completion model.
///
/// One call is one request: implementations classify failures into [`AuditError`] and never
/// retry on their own.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Sends a prompt to the model and returns the raw completion text.
    async fn prompt(&self, prompt_text: &str) -> Result<String, AuditError>;
}

/// Client for the Google Generative Language `generateContent` endpoint.
#[derive(Clone)]
pub struct GoogleGenerativeAIClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl std::fmt::Debug for GoogleGenerativeAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGenerativeAIClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GoogleGenerativeAIClient {
    pub fn new(api_key: String) -> Result<Self, AuditError> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self, AuditError> {
        if api_key.trim().is_empty() {
            return Err(AuditError::MissingCredential);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuditError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client,
        })
    }

    pub fn from_config(api_key: String, config: &AuditConfig) -> Result<Self, AuditError> {
        Ok(
            Self::with_timeout(api_key, Duration::from_secs(config.timeout_secs))?
                .with_model(config.model.clone())
                .with_endpoint(config.endpoint.clone()),
        )
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl AiClient for GoogleGenerativeAIClient {
    async fn prompt(&self, prompt_text: &str) -> Result<String, AuditError> {
        debug!(
            model = %self.model,
            prompt_length = prompt_text.len(),
            "Sending prompt to model"
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt_text }] }]
        });

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuditError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuditError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let completion = completion_text(&text)?;
        debug!(response_length = completion.len(), "Received model completion");
        Ok(completion)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Concatenated text of the first candidate.
fn completion_text(body: &str) -> Result<String, AuditError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|_| AuditError::EmptyResponse)?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AuditError::EmptyResponse);
    }
    Ok(text)
}

/// Maps a non-success HTTP status onto the error taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> AuditError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuditError::Auth(message),
        StatusCode::BAD_REQUEST if message.contains("API key") => AuditError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => AuditError::ServiceUnavailable {
            status: status.as_u16(),
            message,
        },
        s if s.is_server_error() => AuditError::ServiceUnavailable {
            status: s.as_u16(),
            message,
        },
        s => AuditError::Transport(format!("HTTP {}: {}", s.as_u16(), message)),
    }
}

// Exposed for e2e and integration testing
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    type MockResponseAction = Box<dyn FnOnce(&str) -> Result<String, AuditError> + Send>;

    /// A scripted client: each call consumes the next queued response and records the prompt.
    #[derive(Clone, Default)]
    pub struct MockAiClient {
        responses: Arc<Mutex<VecDeque<MockResponseAction>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    impl MockAiClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_response(&self, response: impl Into<String>) {
            let response = response.into();
            lock(&self.responses).push_back(Box::new(move |_| Ok(response)));
        }

        pub fn add_error(&self, error: AuditError) {
            lock(&self.responses).push_back(Box::new(move |_| Err(error)));
        }

        pub fn add_action<F>(&self, action: F)
        where
            F: FnOnce(&str) -> Result<String, AuditError> + Send + 'static,
        {
            lock(&self.responses).push_back(Box::new(action));
        }

        /// Number of prompts received so far.
        pub fn calls(&self) -> usize {
            lock(&self.prompts).len()
        }

        pub fn prompts(&self) -> Vec<String> {
            lock(&self.prompts).clone()
        }
    }

    #[async_trait]
    impl AiClient for MockAiClient {
        async fn prompt(&self, prompt_text: &str) -> Result<String, AuditError> {
            lock(&self.prompts).push(prompt_text.to_string());
            let action = lock(&self.responses).pop_front();

            match action {
                Some(action) => action(prompt_text),
                None => Ok("MOCK_RESPONSE".to_string()),
            }
        }
    }
}
