//! Outbound network settings
//!
//! Network settings are an explicit value handed to each provider
//! constructor. Nothing here touches process-wide state.

use crate::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout (10 minutes; long extraction prompts are slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// HTTP client settings for providers that make outbound calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Proxy URL applied to all requests (e.g. `http://127.0.0.1:7890`)
    pub proxy: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Ignore proxies from the environment (`HTTP_PROXY`, ...)
    pub no_proxy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            no_proxy: false,
        }
    }
}

impl NetworkConfig {
    /// Settings routing all traffic through `proxy`
    pub fn with_proxy(proxy: impl Into<String>) -> Self {
        Self {
            proxy: Some(proxy.into()),
            ..Self::default()
        }
    }

    /// Build an HTTP client honouring these settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` for a malformed proxy URL or when the
    /// client cannot be built.
    pub fn build_client(&self) -> Result<reqwest::Client, LlmError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(self.timeout_secs));

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        if let Some(proxy) = self.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| LlmError::Configuration(format!("Invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))
    }
}
