use crate::agents::genai_client::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::error::AuditError;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable holding the model API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts(),
            initial_delay_ms: policy.initial_delay().as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> Result<RetryPolicy, AuditError> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_multiplier,
        )
    }
}

impl AuditConfig {
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.model.trim().is_empty() {
            return Err(AuditError::InvalidConfig("model must not be empty".to_string()));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(AuditError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(AuditError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        self.retry.policy().map(|_| ())
    }
}

pub fn config_path(work_dir: &Path) -> PathBuf {
    work_dir.join(".auditedge").join("config.json")
}

/// Loads `.auditedge/config.json` from `work_dir`, falling back to defaults when absent.
pub async fn load_config(work_dir: &Path) -> Result<AuditConfig> {
    let path = config_path(work_dir);
    if !path.exists() {
        return Ok(AuditConfig::default());
    }

    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: AuditConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Failed to validate {}", path.display()))?;
    Ok(config)
}

/// API key from the environment, if set to a non-blank value.
pub fn credential_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
