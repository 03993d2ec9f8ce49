use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound for any configured timeout.
pub const MAX_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error(
        "Timeout {name} must be between 1 and {max} seconds, got {value}",
        max = MAX_TIMEOUT_SECS
    )]
    InvalidTimeout { name: &'static str, value: u64 },

    #[error("Upstream URL must use http or https: {0}")]
    UnsupportedScheme(String),
}

/// A single record-store dependency.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL of the service, e.g. `http://users-service:5001`
    ///
    /// Invalid URLs are rejected during config deserialization.
    pub url: Url,
    /// Overrides [`Timeouts::request_secs`] for this upstream
    pub timeout_secs: Option<u64>,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(self.url.to_string()));
        }
        if let Some(value) = self.timeout_secs {
            check_timeout("timeout_secs", value)?;
        }
        Ok(())
    }

    pub fn timeout(&self, timeouts: &Timeouts) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(timeouts.request_secs))
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Timeouts {
    /// Timeout for data requests to any upstream
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
    /// Timeout for liveness checks of upstreams
    #[serde(default = "default_health_secs")]
    pub health_secs: u64,
}

impl Timeouts {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_timeout("request_secs", self.request_secs)?;
        check_timeout("health_secs", self.health_secs)?;
        Ok(())
    }

    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
            health_secs: default_health_secs(),
        }
    }
}

fn default_request_secs() -> u64 {
    5
}

fn default_health_secs() -> u64 {
    2
}

fn check_timeout(name: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 || value > MAX_TIMEOUT_SECS {
        return Err(ValidationError::InvalidTimeout { name, value });
    }
    Ok(())
}
