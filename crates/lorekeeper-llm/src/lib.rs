//! Lorekeeper LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `lorekeeper-domain`, plus
//! the bounded retry wrapper every call site in the parser goes through.
//!
//! # Providers
//!
//! - `MockProvider`: scripted, deterministic provider for tests
//! - `OllamaProvider`: local Ollama API
//! - `OpenAiProvider`: any OpenAI-compatible chat completions endpoint
//! - `AnyProvider`: one of the above, chosen from `ProviderSettings`
//!
//! # Examples
//!
//! ```
//! use lorekeeper_llm::MockProvider;
//! use lorekeeper_domain::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod network;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod serialized;

use lorekeeper_domain::LlmProvider as LlmProviderTrait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use network::NetworkConfig;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{AnyProvider, ProviderKind, ProviderSettings};
pub use retry::{clean_response, invoke_with_retry, RetryPolicy};
pub use serialized::SerializedProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider could not be configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Run an async request to completion from synchronous code
///
/// Providers are invoked from the blocking worker pool, where the ambient
/// runtime handle can drive the request. Outside any runtime a private
/// current-thread runtime is used.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, LlmError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?;
            Ok(runtime.block_on(future))
        }
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Respond(String),
    Fail,
    /// Consumed front to back; the last step repeats once reached
    Sequence(Vec<Option<String>>),
}

#[derive(Debug)]
struct Route {
    pattern: String,
    script: Scripted,
    hits: usize,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    prompts: Vec<String>,
    call_count: usize,
}

/// Mock LLM provider for deterministic testing
///
/// Responses are routed by substring: the first registered pattern found in
/// the prompt decides the outcome, otherwise the default response is
/// returned. No network calls are made. Clones share state, so a test can
/// hand one clone to the parser and inspect calls through another.
///
/// # Examples
///
/// ```
/// use lorekeeper_llm::MockProvider;
/// use lorekeeper_domain::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Routed responses
/// let mut provider = MockProvider::default();
/// provider.add_response("castle", "{\"setting\": \"castle\"}");
/// provider.add_error("forest");
/// assert_eq!(provider.generate("a castle scene").unwrap(), "{\"setting\": \"castle\"}");
/// assert!(provider.generate("a forest scene").is_err());
/// assert_eq!(provider.call_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    latency: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            latency: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Sleep for `latency` on every call, to make concurrency observable
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Respond with `response` to any prompt containing `pattern`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.push_route(pattern.into(), Scripted::Respond(response.into()));
    }

    /// Fail every call whose prompt contains `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>) {
        self.push_route(pattern.into(), Scripted::Fail);
    }

    /// Script successive outcomes for prompts containing `pattern`
    ///
    /// `None` steps fail. Once the script is exhausted its last step repeats.
    pub fn add_sequence(&mut self, pattern: impl Into<String>, steps: Vec<Option<String>>) {
        if steps.is_empty() {
            return;
        }
        self.push_route(pattern.into(), Scripted::Sequence(steps));
    }

    /// Fail the first `failures` matching calls, then respond with `response`
    pub fn fail_first(&mut self, pattern: impl Into<String>, failures: usize, response: impl Into<String>) {
        let mut steps = vec![None; failures];
        steps.push(Some(response.into()));
        self.add_sequence(pattern, steps);
    }

    fn push_route(&mut self, pattern: String, script: Scripted) {
        self.state.lock().unwrap().routes.push(Route {
            pattern,
            script,
            hits: 0,
        });
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().call_count
    }

    /// Number of calls whose prompt contained `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .prompts
            .iter()
            .filter(|p| p.contains(pattern))
            .count()
    }

    /// Every prompt received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().unwrap().prompts.clone()
    }

    /// Reset the call count and recorded prompts
    pub fn reset_call_count(&self) {
        let mut state = self.state.lock().unwrap();
        state.call_count = 0;
        state.prompts.clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.call_count += 1;
            state.prompts.push(prompt.to_string());

            match state.routes.iter_mut().find(|r| prompt.contains(&r.pattern)) {
                Some(route) => {
                    let step = route.hits;
                    route.hits += 1;
                    match &route.script {
                        Scripted::Respond(response) => Some(response.clone()),
                        Scripted::Fail => None,
                        Scripted::Sequence(steps) => steps[step.min(steps.len() - 1)].clone(),
                    }
                }
                None => Some(self.default_response.clone()),
            }
        };

        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        outcome.ok_or_else(|| LlmError::Other("Mock error".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
