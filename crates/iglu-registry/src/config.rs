//! Registry client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default console API root.
pub const DEFAULT_CONSOLE_URL: &str = "https://console.snowplowanalytics.com/api/msc/v1";

/// Environment variable overriding the console API root.
pub const CONSOLE_URL_ENV: &str = "IGLU_CONSOLE_URL";

/// Per-request timeout for console calls, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Console API root, without trailing slash
    pub base_url: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Whole-request timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            base_url: std::env::var(CONSOLE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_CONSOLE_URL.to_string()),
            user_agent: format!("iglu-registry/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RegistryConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific console root
    pub fn new(base_url: &str) -> Self {
        RegistryConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Root of every organization-scoped endpoint.
    pub fn organization_url(&self, org_id: &str) -> String {
        format!(
            "{}/organizations/{}",
            self.base_url.trim_end_matches('/'),
            org_id
        )
    }
}
