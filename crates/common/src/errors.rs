use std::time::Duration;
use thiserror::Error;

/// Error hierarchy for the provider layer.
///
/// Every outbound call surfaces exactly one of these categories; nothing is
/// retried automatically, so callers see the first failure as-is.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Required configuration (API key, endpoint, model) missing before any
    /// network call was attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Backing token environment variable absent or empty.
    #[error("auth error: {0}")]
    Auth(String),

    #[error("{provider} request timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    /// Non-2xx upstream response. `message` carries the response body.
    #[error("{provider} API error (status {status}): {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// 2xx response that cannot be used (empty choices, malformed body).
    #[error("invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Connection-level failures that are neither timeouts nor HTTP errors.
    #[error("{provider} transport error: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
}

impl LlmError {
    /// Map a reqwest error, classifying timeouts before generic transport
    /// failures so callers can distinguish the two.
    pub fn from_reqwest(provider: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout {
                provider: provider.to_string(),
                after: timeout,
            }
        } else if let Some(status) = err.status() {
            LlmError::Http {
                provider: provider.to_string(),
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            LlmError::Transport {
                provider: provider.to_string(),
                source: err,
            }
        }
    }

    /// Upstream HTTP status, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Http { status, .. } => Some(*status),
            LlmError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout { .. })
    }

    /// Errors raised before any network traffic happened.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LlmError::Configuration(_) | LlmError::UnsupportedProvider(_) | LlmError::Auth(_)
        )
    }
}

pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = LlmError::Http {
            provider: "openai".into(),
            status: 429,
            message: "rate limited".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert!(!err.is_timeout());

        let cfg = LlmError::Configuration("missing API key".into());
        assert_eq!(cfg.status(), None);
        assert!(cfg.is_configuration());
    }

    #[test]
    fn test_timeout_classification() {
        let err = LlmError::Timeout {
            provider: "anthropic".into(),
            after: Duration::from_secs(30),
        };
        assert!(err.is_timeout());
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn test_unsupported_provider_message() {
        let err = LlmError::UnsupportedProvider("cohere".into());
        assert_eq!(err.to_string(), "unsupported provider: cohere");
    }
}
