//! Level-by-level reduction of segment results

use crate::prompt::merge_prompt;
use crate::response::parse_structured;
use crate::structural::{character_names, dedup_characters, fallback_merge_group};
use lorekeeper_domain::{ExtractionCategory, LlmProvider};
use lorekeeper_llm::{invoke_with_retry, RetryPolicy};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One window of results reconciled by a single merge call
#[derive(Debug)]
struct MergeGroup {
    level: usize,
    index: usize,
    items: Vec<Value>,
}

/// Reduces a list of results to one by merging fixed-size groups
///
/// Each level partitions the current list into consecutive groups of
/// `group_size` and merges every group with the model. A group whose model
/// merge fails or comes back malformed is merged structurally instead. The
/// loop runs until a single value remains.
pub struct HierarchicalMerger<L> {
    llm: Arc<L>,
    group_size: usize,
    retry: RetryPolicy,
}

impl<L> HierarchicalMerger<L>
where
    L: LlmProvider + Send + Sync + 'static,
{
    /// Create a merger; `group_size` is raised to at least 2
    pub fn new(llm: Arc<L>, group_size: usize, retry: RetryPolicy) -> Self {
        Self {
            llm,
            group_size: group_size.max(2),
            retry,
        }
    }

    /// Merge `results` into a single value of `category`'s shape
    ///
    /// An empty list gives the category's empty value and a single result is
    /// returned untouched. Neither case calls the model.
    pub async fn merge(&self, results: Vec<Value>, category: ExtractionCategory) -> Value {
        let mut current = results;
        let mut level = 0;

        while current.len() > 1 {
            level += 1;
            debug!(category = %category, level, items = current.len(), "Merging level");

            let mut next = Vec::with_capacity(current.len().div_ceil(self.group_size));
            let mut items = current.into_iter().peekable();
            let mut index = 0;

            while items.peek().is_some() {
                index += 1;
                let group = MergeGroup {
                    level,
                    index,
                    items: items.by_ref().take(self.group_size).collect(),
                };
                next.push(self.merge_group(group, category).await);
            }

            current = next;
        }

        let merged = current.pop().unwrap_or_else(|| category.empty_value());
        if level > 0 {
            info!(category = %category, levels = level, "Hierarchical merge complete");
        }
        merged
    }

    async fn merge_group(&self, mut group: MergeGroup, category: ExtractionCategory) -> Value {
        if group.items.len() == 1 {
            return group.items.pop().unwrap_or_else(|| category.empty_value());
        }

        let serialized = match serde_json::to_string_pretty(&group.items) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(category = %category, level = group.level, group = group.index, error = %e,
                    "Could not serialize merge group, merging structurally");
                return fallback_merge_group(category, group.items);
            }
        };

        let prompt = merge_prompt(category, &serialized);
        let llm = Arc::clone(&self.llm);
        let retry = self.retry;
        let operation = format!("merge {} level {} group {}", category, group.level, group.index);

        let response =
            match tokio::task::spawn_blocking(move || invoke_with_retry(llm.as_ref(), &prompt, &retry, &operation))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(category = %category, level = group.level, group = group.index, error = %e,
                        "Merge call panicked, merging structurally");
                    return fallback_merge_group(category, group.items);
                }
            };

        let merged = match parse_structured(category, &response) {
            Some(Value::Array(characters)) => Some(Value::Array(dedup_characters(characters))),
            other => other,
        };

        match merged.filter(|merged| !is_empty(merged) && keeps_named_characters(&group.items, merged)) {
            Some(merged) => merged,
            None => {
                warn!(
                    category = %category,
                    level = group.level,
                    group = group.index,
                    items = group.items.len(),
                    empty = response.is_empty(),
                    "Model merge unusable, merging structurally"
                );
                fallback_merge_group(category, group.items)
            }
        }
    }
}

/// Whether a character merge kept at least one named input character
///
/// Mappings and groups without named characters always pass.
fn keeps_named_characters(inputs: &[Value], merged: &Value) -> bool {
    let Value::Array(merged) = merged else {
        return true;
    };
    let input_names = character_names(inputs.iter().filter_map(Value::as_array).flatten());
    input_names.is_empty() || !input_names.is_disjoint(&character_names(merged))
}

/// Empty mapping or list
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
