use chrono::{DateTime, Duration, Utc};
use common::{LlmError, LlmResult};
use parking_lot::Mutex;
use std::env;
use tracing::{debug, warn};

const DEFAULT_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Bearer-token cache for gateway providers (enterprise, Apigee).
///
/// Tokens come from an environment variable and are reused for a fixed TTL.
/// "Refresh" only discards the cache and re-reads the variable; there is
/// no network refresh flow, so actual rotation depends on the process being
/// restarted with a new value.
///
/// Constructed explicitly and shared via `Arc` instead of living in module
/// state, so tests and multi-tenant callers get isolated instances.
#[derive(Debug)]
pub struct TokenManager {
    env_var: String,
    ttl: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(env_var: impl Into<String>, ttl: std::time::Duration) -> Self {
        Self {
            env_var: env_var.into(),
            ttl: Duration::seconds(ttl.as_secs() as i64),
            cached: Mutex::new(None),
        }
    }

    /// Manager for the enterprise LLM gateway token.
    pub fn enterprise() -> Self {
        Self::new(
            "ENTERPRISE_LLM_TOKEN",
            std::time::Duration::from_secs(DEFAULT_TTL_SECS as u64),
        )
    }

    /// Manager for the Apigee gateway token.
    pub fn apigee() -> Self {
        Self::new(
            "APIGEE_TOKEN",
            std::time::Duration::from_secs(DEFAULT_TTL_SECS as u64),
        )
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Whether the backing environment variable is currently set. Pure
    /// configuration check, used for provider availability.
    pub fn is_configured(&self) -> bool {
        env::var(&self.env_var).map(|v| !v.is_empty()).unwrap_or(false)
    }

    /// Return the cached token, re-reading the environment variable on
    /// first use or after the TTL window has passed.
    pub fn get_valid_token(&self) -> LlmResult<String> {
        self.valid_token_at(Utc::now())
    }

    /// Discard the cache and re-read immediately.
    pub fn refresh_token(&self) -> LlmResult<String> {
        debug!(env_var = %self.env_var, "refreshing token");
        self.invalidate();
        self.get_valid_token()
    }

    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    pub fn valid_token_at(&self, now: DateTime<Utc>) -> LlmResult<String> {
        let mut guard = self.cached.lock();

        if let Some(cached) = guard.as_ref() {
            if now < cached.expires_at {
                return Ok(cached.token.clone());
            }
            debug!(env_var = %self.env_var, "cached token expired");
        }

        let token = self.read_env()?;
        *guard = Some(CachedToken {
            token: token.clone(),
            expires_at: now + self.ttl,
        });
        Ok(token)
    }

    fn read_env(&self) -> LlmResult<String> {
        match env::var(&self.env_var) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => {
                warn!(env_var = %self.env_var, "token environment variable is not set");
                Err(LlmError::Auth(format!(
                    "environment variable {} is not set",
                    self.env_var
                )))
            }
        }
    }
}
