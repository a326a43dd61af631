use crate::agents::genai_client::{AiClient, GoogleGenerativeAIClient};
use crate::config::AuditConfig;
use crate::domain::AuditResult;
use crate::error::AuditError;
use crate::normalizer::normalize;
use crate::prompt::build_prompt;
use crate::retry::{RetryPolicy, with_retry};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

/// Runs the audit pipeline: build prompt, invoke the model with retry, normalize.
///
/// Holds no mutable state, so one auditor can serve concurrent requests. Dropping an
/// in-flight `analyze` future cancels the request and any pending backoff, and yields no
/// result.
#[derive(Clone)]
pub struct Auditor<C: AiClient> {
    client: C,
    policy: RetryPolicy,
}

impl<C: AiClient> Auditor<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn analyze(&self, contract: &str) -> Result<AuditResult, AuditError> {
        let span = info_span!("analyze", request_id = %Uuid::new_v4());
        self.run(contract).instrument(span).await
    }

    async fn run(&self, contract: &str) -> Result<AuditResult, AuditError> {
        let prompt = build_prompt(contract);
        info!(
            contract_length = contract.len(),
            prompt_length = prompt.len(),
            "Starting contract analysis"
        );

        let raw = with_retry(&self.policy, || self.client.prompt(&prompt)).await?;
        debug!(response_length = raw.len(), "Model response received");

        let result = normalize(&raw)?;
        info!(
            metrics = result.metrics.len(),
            suggestions = result.suggestions.len(),
            "Contract analysis complete"
        );
        Ok(result)
    }
}

impl Auditor<GoogleGenerativeAIClient> {
    pub fn from_config(api_key: String, config: &AuditConfig) -> Result<Self, AuditError> {
        config.validate()?;
        let client = GoogleGenerativeAIClient::from_config(api_key, config)?;
        Ok(Self::new(client).with_retry_policy(config.retry.policy()?))
    }
}

/// Analyzes `contract` with the default configuration and the given API key.
pub async fn analyze(contract: &str, credential: &str) -> Result<AuditResult, AuditError> {
    Auditor::from_config(credential.to_string(), &AuditConfig::default())?
        .analyze(contract)
        .await
}
