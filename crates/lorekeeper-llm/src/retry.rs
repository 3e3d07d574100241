//! Bounded retry around completion calls
//!
//! Every model call in the pipeline goes through [`invoke_with_retry`]. It
//! never fails: after the last attempt it hands back whatever it has (often
//! an empty string) and the caller decides how to degrade.

use lorekeeper_domain::LlmProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// How many times to call the provider and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self { max_attempts, delay_ms }
    }

    /// Delay between attempts
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Call `provider` until it returns non-blank text or attempts run out
///
/// Errors and blank responses are both retried. The returned text has been
/// through [`clean_response`]. When every attempt fails the result is the
/// last cleaned response, which is empty, so callers must check for that.
///
/// # Examples
///
/// ```
/// use lorekeeper_llm::{invoke_with_retry, MockProvider, RetryPolicy};
///
/// let mut provider = MockProvider::default();
/// provider.fail_first("prompt", 1, "```json\n{\"ok\": true}\n```");
///
/// let text = invoke_with_retry(&provider, "prompt", &RetryPolicy::new(3, 0), "example");
/// assert_eq!(text, "{\"ok\": true}");
/// assert_eq!(provider.call_count(), 2);
/// ```
pub fn invoke_with_retry<L>(provider: &L, prompt: &str, policy: &RetryPolicy, operation: &str) -> String
where
    L: LlmProvider + ?Sized,
{
    let attempts = policy.max_attempts.max(1);
    let mut last = String::new();

    for attempt in 1..=attempts {
        match provider.generate(prompt) {
            Ok(raw) => {
                let cleaned = clean_response(&raw);
                if !cleaned.is_empty() {
                    if attempt > 1 {
                        info!(operation, attempts = attempt, "Completion succeeded after retries");
                    }
                    return cleaned;
                }
                warn!(operation, attempt, max_attempts = attempts, "Completion was empty");
                last = cleaned;
            }
            Err(e) => {
                warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    model = provider.model_name(),
                    error = %e,
                    "Completion failed"
                );
            }
        }

        if attempt < attempts && policy.delay_ms > 0 {
            std::thread::sleep(policy.delay());
        }
    }

    warn!(operation, attempts, "Giving up on completion");
    last
}

/// Strip Markdown code fences and reasoning blocks from a model response
///
/// # Examples
///
/// ```
/// use lorekeeper_llm::clean_response;
///
/// assert_eq!(clean_response("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(clean_response("<think>hmm</think>\n[1, 2]"), "[1, 2]");
/// ```
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.to_string();

    while let Some(start) = text.find("<think>") {
        match text[start..].find("</think>") {
            Some(offset) => text.replace_range(start..start + offset + "</think>".len(), ""),
            None => {
                text.truncate(start);
                break;
            }
        }
    }

    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;

    fn no_delay(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, 0)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_first_success_makes_one_call() {
        let provider = MockProvider::new("answer");
        assert_eq!(invoke_with_retry(&provider, "q", &no_delay(3), "test"), "answer");
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_errors_exhaust_attempts_and_return_empty() {
        let mut provider = MockProvider::default();
        provider.add_error("q");
        assert_eq!(invoke_with_retry(&provider, "q", &no_delay(3), "test"), "");
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_blank_responses_are_retried() {
        let mut provider = MockProvider::default();
        provider.add_sequence("q", vec![Some("   ".to_string()), Some("```\n```".to_string()), Some("late".to_string())]);
        assert_eq!(invoke_with_retry(&provider, "q", &no_delay(3), "test"), "late");
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_zero_attempts_still_calls_once() {
        let provider = MockProvider::new("x");
        assert_eq!(invoke_with_retry(&provider, "q", &no_delay(0), "test"), "x");
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_clean_response_fences() {
        assert_eq!(clean_response("```json\n[{\"name\": \"A\"}]\n```"), "[{\"name\": \"A\"}]");
        assert_eq!(clean_response("  plain text  "), "plain text");
        assert_eq!(clean_response("```\n```"), "");
    }

    #[test]
    fn test_clean_response_unterminated_think() {
        assert_eq!(clean_response("{\"a\": 1}<think>never closed"), "{\"a\": 1}");
    }

    #[test]
    fn test_policy_from_toml() {
        let policy: RetryPolicy = toml::from_str("delay_ms = 10").unwrap();
        assert_eq!(policy, RetryPolicy::new(3, 10));
    }
}
