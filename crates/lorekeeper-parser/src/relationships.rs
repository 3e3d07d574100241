//! Relationship analysis over the merged character list

use crate::prompt::relationship_prompt;
use crate::response::extract_json;
use lorekeeper_domain::LlmProvider;
use lorekeeper_llm::{invoke_with_retry, RetryPolicy};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Asks the model how the final characters relate to each other
pub struct RelationshipAnalyzer<L> {
    llm: Arc<L>,
    retry: RetryPolicy,
}

impl<L> RelationshipAnalyzer<L>
where
    L: LlmProvider + Send + Sync + 'static,
{
    /// Create an analyzer
    pub fn new(llm: Arc<L>, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Analyze `characters`
    ///
    /// No characters means no call and an empty mapping. A failed call or an
    /// unusable response also yields an empty mapping. A bare list in the
    /// response is taken as the `relationships` entry.
    pub async fn analyze(&self, characters: &[Value]) -> Map<String, Value> {
        if characters.is_empty() {
            return Map::new();
        }

        let serialized = match serde_json::to_string_pretty(characters) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(error = %e, "Could not serialize characters for relationship analysis");
                return Map::new();
            }
        };

        let prompt = relationship_prompt(&serialized);
        let llm = Arc::clone(&self.llm);
        let retry = self.retry;
        let response = match tokio::task::spawn_blocking(move || {
            invoke_with_retry(llm.as_ref(), &prompt, &retry, "relationship analysis")
        })
        .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Relationship analysis panicked");
                return Map::new();
            }
        };

        match extract_json(&response) {
            Some(Value::Object(map)) => {
                info!(
                    characters = characters.len(),
                    relationships = map.get("relationships").and_then(serde_json::Value::as_array).map_or(0, Vec::len),
                    "Relationship analysis complete"
                );
                map
            }
            Some(Value::Array(relationships)) => {
                let mut map = Map::new();
                map.insert("relationships".to_string(), Value::Array(relationships));
                map
            }
            _ => {
                warn!(
                    characters = characters.len(),
                    empty = response.is_empty(),
                    "Relationship analysis produced no usable result"
                );
                Map::new()
            }
        }
    }
}
