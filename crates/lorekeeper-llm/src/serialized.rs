//! Serialize access to clients that are not safe for concurrent use

use lorekeeper_domain::LlmProvider;
use std::sync::{Mutex, PoisonError};

/// Wraps a provider so at most one call runs at a time
///
/// The parser shares its provider across worker threads, which requires
/// `Sync`. Clients that are `Send` but not `Sync` can be wrapped here.
#[derive(Debug)]
pub struct SerializedProvider<L> {
    model: String,
    inner: Mutex<L>,
}

impl<L: LlmProvider> SerializedProvider<L> {
    /// Wrap `provider`
    pub fn new(provider: L) -> Self {
        Self {
            model: provider.model_name().to_string(),
            inner: Mutex::new(provider),
        }
    }

    /// Unwrap the provider
    pub fn into_inner(self) -> L {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: LlmProvider> LlmProvider for SerializedProvider<L> {
    type Error = L::Error;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let provider = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        provider.generate(prompt)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
