use thiserror::Error;

/// Failure classes of the audit pipeline.
///
/// Transport failures are classified once, at the model client boundary. Everything
/// downstream (retry, normalization, callers) only inspects the variant.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The service rejected the API credential. Never retried.
    #[error("API key rejected by the model service: {0}")]
    Auth(String),

    /// Transient remote failure (HTTP 5xx or rate limiting). The only retried class.
    #[error("model service unavailable (HTTP {status}): {message}")]
    ServiceUnavailable { status: u16, message: String },

    /// Network failure or an unexpected HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("model returned no usable text")]
    EmptyResponse,

    /// The model answered, but not in the requested shape.
    #[error("malformed model response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("analysis failed after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<AuditError>,
    },

    #[error("API key is not defined")]
    MissingCredential,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuditError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        AuditError::MalformedResponse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    /// Whether the retry controller may try again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuditError::ServiceUnavailable { .. })
    }

    /// Raw model output attached to a malformed-response failure, for diagnostics.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AuditError::MalformedResponse { raw, .. } => Some(raw),
            AuditError::RetryExhausted { last, .. } => last.raw_response(),
            _ => None,
        }
    }
}
