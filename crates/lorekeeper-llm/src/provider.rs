//! Provider selection from configuration

use crate::network::NetworkConfig;
use crate::{ollama, openai, LlmError, MockProvider, OllamaProvider, OpenAiProvider};
use lorekeeper_domain::LlmProvider;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "LOREKEEPER_API_KEY";

/// Which backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    Ollama,
    /// OpenAI-compatible chat completions API
    #[serde(rename = "openai")]
    OpenAi,
    /// Offline mock returning an empty JSON object
    Mock,
}

/// LLM provider settings as they appear in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Backend kind
    pub provider: ProviderKind,

    /// Endpoint or base URL; the backend default when unset
    pub endpoint: Option<String>,

    /// Model name
    pub model: String,

    /// API key (OpenAI-compatible backends); falls back to `LOREKEEPER_API_KEY`
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Generation cap in tokens
    pub max_tokens: Option<u32>,

    /// Outbound network settings
    pub network: NetworkConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            endpoint: None,
            model: "qwen2.5:7b".to_string(),
            api_key: None,
            temperature: Some(0.7),
            max_tokens: None,
            network: NetworkConfig::default(),
        }
    }
}

impl ProviderSettings {
    /// The configured API key, or the one from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }

    /// Build the provider these settings describe
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` when an OpenAI-compatible backend has
    /// no API key, or when the HTTP client cannot be built.
    pub fn build(&self) -> Result<AnyProvider, LlmError> {
        match self.provider {
            ProviderKind::Ollama => {
                let endpoint = self.endpoint.as_deref().unwrap_or(ollama::DEFAULT_ENDPOINT);
                let mut provider = OllamaProvider::new(endpoint, &self.model, &self.network)?;
                if let Some(t) = self.temperature {
                    provider = provider.with_temperature(t);
                }
                if let Some(n) = self.max_tokens {
                    provider = provider.with_max_tokens(n);
                }
                Ok(AnyProvider::Ollama(provider))
            }
            ProviderKind::OpenAi => {
                let api_key = self.resolved_api_key().ok_or_else(|| {
                    LlmError::Configuration(format!("No API key configured (set api_key or {})", API_KEY_ENV))
                })?;
                let base_url = self.endpoint.as_deref().unwrap_or(openai::DEFAULT_BASE_URL);
                let mut provider = OpenAiProvider::new(base_url, api_key, &self.model, &self.network)?;
                if let Some(t) = self.temperature {
                    provider = provider.with_temperature(t);
                }
                if let Some(n) = self.max_tokens {
                    provider = provider.with_max_tokens(n);
                }
                Ok(AnyProvider::OpenAi(provider))
            }
            ProviderKind::Mock => Ok(AnyProvider::Mock(MockProvider::new("{}"))),
        }
    }
}

/// A provider chosen at runtime
#[derive(Debug, Clone)]
pub enum AnyProvider {
    /// Ollama backend
    Ollama(OllamaProvider),
    /// OpenAI-compatible backend
    OpenAi(OpenAiProvider),
    /// Mock backend
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        match self {
            AnyProvider::Ollama(p) => p.generate(prompt),
            AnyProvider::OpenAi(p) => p.generate(prompt),
            AnyProvider::Mock(p) => p.generate(prompt),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            AnyProvider::Ollama(p) => p.model_name(),
            AnyProvider::OpenAi(p) => p.model_name(),
            AnyProvider::Mock(p) => p.model_name(),
        }
    }
}
