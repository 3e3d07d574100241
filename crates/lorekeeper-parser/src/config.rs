//! Configuration for the knowledge parser

use lorekeeper_llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the knowledge parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum chunk size (characters)
    pub max_chunk_size: usize,

    /// Segment extractions allowed in flight at once
    pub max_concurrency: usize,

    /// Results reconciled per merge call
    pub merge_group_size: usize,

    /// Passages requested from the similarity index per segment
    pub retrieval_top_k: usize,

    /// Prefix length used as context when no index is available
    pub context_fallback_chars: usize,

    /// How long to wait for in-flight segments after a stop request (seconds)
    pub stop_wait_secs: u64,

    /// Collapse whitespace runs before segmentation
    pub preprocess_whitespace: bool,

    /// Retry policy for every model call
    pub retry: RetryPolicy,
}

impl ParserConfig {
    /// Bounded wait after a stop request
    pub fn stop_wait(&self) -> Duration {
        Duration::from_secs(self.stop_wait_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        if self.merge_group_size < 2 {
            return Err("merge_group_size must be at least 2".to_string());
        }
        if self.retrieval_top_k == 0 {
            return Err("retrieval_top_k must be greater than 0".to_string());
        }
        if self.context_fallback_chars == 0 {
            return Err("context_fallback_chars must be greater than 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for ParserConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_chunk_size: 50_000,
            max_concurrency: 8,
            merge_group_size: 4,
            retrieval_top_k: 8,
            context_fallback_chars: 2_000,
            stop_wait_secs: 30,
            preprocess_whitespace: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl ParserConfig {
    /// Fast preset: wider fan-out, fewer and quicker retries
    pub fn fast() -> Self {
        Self {
            max_concurrency: 16,
            merge_group_size: 8,
            retry: RetryPolicy::new(2, 1_000),
            stop_wait_secs: 10,
            ..Self::default()
        }
    }

    /// Thorough preset: smaller chunks and more retrieved context per segment
    pub fn thorough() -> Self {
        Self {
            max_chunk_size: 20_000,
            max_concurrency: 4,
            merge_group_size: 3,
            retrieval_top_k: 12,
            retry: RetryPolicy::new(5, 3_000),
            stop_wait_secs: 60,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ParserConfig::default().validate().is_ok());
        assert!(ParserConfig::fast().validate().is_ok());
        assert!(ParserConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.max_chunk_size, 50_000);
        assert_eq!(config.merge_group_size, 4);
        assert_eq!(config.retrieval_top_k, 8);
        assert_eq!(config.context_fallback_chars, 2_000);
        assert_eq!(config.retry, RetryPolicy::new(3, 2_000));
    }

    #[test]
    fn test_invalid_group_size() {
        let config = ParserConfig {
            merge_group_size: 1,
            ..ParserConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("merge_group_size"));
    }

    #[test]
    fn test_invalid_concurrency() {
        let config = ParserConfig {
            max_concurrency: 0,
            ..ParserConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let config = ParserConfig {
            max_chunk_size: 0,
            ..ParserConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ParserConfig::thorough();
        let parsed = ParserConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml() {
        let config = ParserConfig::from_toml("max_concurrency = 2\n[retry]\ndelay_ms = 0\n").unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_ms, 0);
        assert_eq!(config.max_chunk_size, 50_000);
    }
}
