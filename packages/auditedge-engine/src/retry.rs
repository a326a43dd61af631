use crate::error::AuditError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded exponential backoff for transient model failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(2000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, AuditError> {
        if max_attempts == 0 {
            return Err(AuditError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier <= 0.0 {
            return Err(AuditError::InvalidConfig(format!(
                "backoff_multiplier must be a positive number, got {}",
                backoff_multiplier
            )));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }
}

/// Per-invocation retry bookkeeping. Lives only for one `with_retry` call.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    delay: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            delay: policy.initial_delay,
        }
    }

    fn advance_delay(&mut self, multiplier: f64) {
        self.delay = Duration::try_from_secs_f64(self.delay.as_secs_f64() * multiplier)
            .unwrap_or(Duration::MAX);
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the policy's attempts
/// are used up.
///
/// Only [`AuditError::ServiceUnavailable`] is retried. The backoff sleep is an async
/// suspension point, so dropping the returned future cancels a pending retry.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AuditError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AuditError>>,
{
    let mut state = RetryState::new(policy);

    loop {
        state.attempt += 1;

        match op().await {
            Ok(value) => {
                if state.attempt > 1 {
                    info!(attempt = state.attempt, "Model call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() => {
                if state.attempt >= policy.max_attempts {
                    warn!(
                        attempts = state.attempt,
                        "Model service still unavailable; giving up: {}", err
                    );
                    return Err(AuditError::RetryExhausted {
                        attempts: state.attempt,
                        last: Box::new(err),
                    });
                }

                warn!(
                    attempt = state.attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = state.delay.as_millis() as u64,
                    "Model service unavailable ({}); retrying",
                    err
                );
                tokio::time::sleep(state.delay).await;
                state.advance_delay(policy.backoff_multiplier);
            }
            Err(err) => return Err(err),
        }
    }
}
