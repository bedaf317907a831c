//! Service endpoint configuration
//!
//! The base URL comes from `COVERAGE_API_BASE`, falling back to
//! `COVERAGE_BACKEND_URL`; an empty value counts as unset. `COVERAGE_API_KEY`
//! adds an `X-API-Key` header to every request. Nothing else is read from the
//! environment.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::time::Duration;
use url::Url;
use crate::error::ConfigError;

pub const API_BASE_ENV: &str = "COVERAGE_API_BASE";
pub const BACKEND_URL_ENV: &str = "COVERAGE_BACKEND_URL";
pub const API_KEY_ENV: &str = "COVERAGE_API_KEY";

pub const HEALTH_PATH: &str = "/api/v1/healthz";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Where and how to reach the rendering service
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
    health_poll_interval: Duration,
}

impl ServiceConfig {
    /// Create a configuration for an absolute base URL. Trailing slashes are removed.
    ///
    /// # Errors
    /// Returns an error when the URL is empty or cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
        let trimmed = base_url.as_ref().trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(missing_base_url());
        }
        Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_url: trimmed.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_poll_interval: DEFAULT_HEALTH_POLL_INTERVAL,
        })
    }

    /// Resolve from the process environment
    ///
    /// # Errors
    /// Returns an error when no usable base URL is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&env)
    }

    /// Resolve from an explicit variable map
    ///
    /// # Errors
    /// Returns an error when no usable base URL is set.
    pub fn from_env_map<S: BuildHasher>(env: &HashMap<String, String, S>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let base = non_empty(API_BASE_ENV)
            .or_else(|| non_empty(BACKEND_URL_ENV))
            .ok_or_else(missing_base_url)?;

        let mut config = Self::new(base)?;
        if let Some(key) = non_empty(API_KEY_ENV) {
            config = config.with_api_key(key);
        }
        Ok(config)
    }

    /// Set the API key. An empty key disables the header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.is_empty() { None } else { Some(api_key) };
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Zero means a single check with no schedule
    pub fn with_health_poll_interval(mut self, interval: Duration) -> Self {
        self.health_poll_interval = interval;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn health_poll_interval(&self) -> Duration {
        self.health_poll_interval
    }

    /// Absolute URL for a service path such as `/api/v1/healthz`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers sent with every request
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("X-API-Key".to_string(), key.clone()));
        }
        headers
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("health_poll_interval", &self.health_poll_interval)
            .finish()
    }
}

fn missing_base_url() -> ConfigError {
    ConfigError::MissingBaseUrl {
        primary: API_BASE_ENV.to_string(),
        fallback: BACKEND_URL_ENV.to_string(),
    }
}
