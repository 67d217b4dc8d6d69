use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RelayError, Result};

/// REST base of the hosted queue service.
pub const DEFAULT_API_BASE: &str = "https://api.relay-queue.dev";

/// Root configuration for a relay application.
///
/// Consumed once at manager construction; never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Credential for the hosted publish API.
    pub token: String,

    /// Stable callback endpoint the hosted service delivers to.
    ///
    /// Example: `https://your-domain.com/api/queue`
    pub endpoint: String,

    /// REST base of the hosted service.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Queues to provision at startup.
    #[serde(default)]
    pub queues: Vec<String>,

    /// Retry policy forwarded to the hosted service. Disabled by default.
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

impl RelayConfig {
    /// Create a configuration from a token and a callback endpoint.
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
            api_base: default_api_base(),
            queues: Vec::new(),
            retry: None,
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Declare queues to provision at startup.
    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }

    /// Set the retry policy forwarded to the hosted service.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Override the hosted service REST base.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Retry policy executed entirely by the hosted service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts after the first.
    pub retries: u32,

    /// Backoff strategy between attempts.
    #[serde(default)]
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy with the given retry count and exponential backoff.
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            backoff: Backoff::default(),
        }
    }
}

/// Backoff strategy between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay each time.
    Fixed,
    /// Delay increases linearly.
    Linear,
    /// Delay doubles each time.
    #[default]
    Exponential,
}

impl Backoff {
    /// Wire representation used in delivery headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = RelayConfig::new("t", "https://x/api/q");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.queues.is_empty());
        assert!(config.retry.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            token = "secret"
            endpoint = "https://example.com/api/queue"
            queues = ["default", "activity"]

            [retry]
            retries = 5
            backoff = "linear"
        "#;

        let config = RelayConfig::parse_toml(toml).unwrap();
        assert_eq!(config.token, "secret");
        assert_eq!(config.queues, vec!["default", "activity"]);
        let retry = config.retry.unwrap();
        assert_eq!(retry.retries, 5);
        assert_eq!(retry.backoff, Backoff::Linear);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = RelayConfig::parse_toml("endpoint = ");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("RELAY_TEST_TOKEN", "from-env");
        let toml = r#"
            token = "${RELAY_TEST_TOKEN}"
            endpoint = "https://example.com/api/queue"
        "#;

        let config = RelayConfig::parse_toml(toml).unwrap();
        assert_eq!(config.token, "from-env");
    }

    #[test]
    fn test_backoff_wire_names() {
        assert_eq!(Backoff::Fixed.as_str(), "fixed");
        assert_eq!(Backoff::Linear.as_str(), "linear");
        assert_eq!(Backoff::Exponential.as_str(), "exponential");
    }
}
