//! Per-segment extraction

use crate::prompt::extraction_prompt;
use crate::response::{attach_metadata, parse_structured, textual_fallback};
use crate::retriever::ContextRetriever;
use crate::structural::dedup_characters;
use lorekeeper_domain::{Chunk, ExtractionCategory, LlmProvider, NoIndex, SimilarityIndex};
use lorekeeper_llm::{invoke_with_retry, RetryPolicy};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns one chunk into a structured result for one category
///
/// Extraction is blocking: it may spend the whole retry budget waiting on
/// the model. The dispatcher runs it on the blocking pool.
pub struct SegmentExtractor<L, I = NoIndex> {
    llm: Arc<L>,
    retriever: ContextRetriever<I>,
    retry: RetryPolicy,
    top_k: usize,
}

impl<L, I> SegmentExtractor<L, I>
where
    L: LlmProvider,
    I: SimilarityIndex,
{
    /// Create an extractor
    pub fn new(llm: Arc<L>, retriever: ContextRetriever<I>, retry: RetryPolicy, top_k: usize) -> Self {
        Self {
            llm,
            retriever,
            retry,
            top_k,
        }
    }

    /// Whether context comes from a similarity index
    pub fn has_index(&self) -> bool {
        self.retriever.has_index()
    }

    /// Extract `category` elements from `chunk`
    ///
    /// Returns `None` when the model gave nothing back after every retry or
    /// reported nothing for this segment. Text that does not parse is kept
    /// as a textual fallback.
    pub fn extract(&self, chunk: &Chunk, category: ExtractionCategory) -> Option<Value> {
        let context = self
            .retriever
            .retrieve(&chunk.text, category.context_query(), self.top_k);
        let prompt = extraction_prompt(category, chunk.order, &context);

        debug!(
            category = %category,
            order = chunk.order,
            context_chars = context.chars().count(),
            prompt_chars = prompt.chars().count(),
            "Extracting segment"
        );

        let operation = format!("extract {} {}", category, chunk.segment_id);
        let response = invoke_with_retry(self.llm.as_ref(), &prompt, &self.retry, &operation);
        if response.is_empty() {
            warn!(
                category = %category,
                order = chunk.order,
                segment_id = %chunk.segment_id,
                "No response for segment, dropping it"
            );
            return None;
        }

        let mut value = match parse_structured(category, &response) {
            Some(Value::Array(characters)) if characters.is_empty() => Value::Array(characters),
            Some(Value::Array(characters)) => match dedup_characters(characters) {
                unique if unique.is_empty() => {
                    warn!(
                        category = %category,
                        order = chunk.order,
                        "Every character in the response is nameless, keeping raw text"
                    );
                    textual_fallback(category, &response)
                }
                unique => Value::Array(unique),
            },
            Some(value) => value,
            None => {
                warn!(
                    category = %category,
                    order = chunk.order,
                    response_chars = response.chars().count(),
                    "Response is not valid structured data, keeping raw text"
                );
                textual_fallback(category, &response)
            }
        };

        if is_empty(&value) {
            debug!(category = %category, order = chunk.order, "Nothing found in segment");
            return None;
        }

        attach_metadata(&mut value, &chunk.metadata());
        Some(value)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeeper_domain::{SegmentMetadata, SEGMENT_METADATA_KEY};
    use lorekeeper_llm::MockProvider;
    use serde_json::json;

    fn extractor(provider: MockProvider) -> SegmentExtractor<MockProvider> {
        SegmentExtractor::new(
            Arc::new(provider),
            ContextRetriever::<NoIndex>::new(None, 2000),
            RetryPolicy::new(3, 0),
            8,
        )
    }

    #[test]
    fn test_structured_result_gets_metadata() {
        let extractor = extractor(MockProvider::new("```json\n{\"setting\": \"X\"}\n```"));
        let chunk = Chunk::new("A castle on a hill.", 4, 0, 19);

        let value = extractor.extract(&chunk, ExtractionCategory::Worldview).unwrap();
        assert_eq!(value["setting"], "X");
        let meta = SegmentMetadata::from_annotated(&value).unwrap();
        assert_eq!(meta.order, 4);
        assert_eq!(meta.segment_id, "seg_004");
    }

    #[test]
    fn test_prompt_carries_order_and_prefix() {
        let provider = MockProvider::new("{}");
        let extractor = extractor(provider.clone());
        let chunk = Chunk::new("x".repeat(3000), 2, 0, 3000);

        extractor.extract(&chunk, ExtractionCategory::Plot);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        let expected = format!("[Segment 2] {}", "x".repeat(2000));
        assert!(prompts[0].ends_with(&expected));
    }

    #[test]
    fn test_characters_get_metadata_per_element() {
        let extractor = extractor(MockProvider::new(
            "[{\"name\": \"A\", \"age\": 25}, {\"name\": \"A\", \"role\": \"hero\"}, {\"name\": \"B\"}]",
        ));
        let chunk = Chunk::new("text", 1, 0, 4);

        let value = extractor.extract(&chunk, ExtractionCategory::Characters).unwrap();
        let characters = value.as_array().unwrap();
        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0]["role"], "hero");
        assert!(characters.iter().all(|c| c.get(SEGMENT_METADATA_KEY).is_some()));
    }

    #[test]
    fn test_unparseable_response_is_kept_as_text() {
        let extractor = extractor(MockProvider::new("The world is a flat disc."));
        let chunk = Chunk::new("text", 3, 0, 4);

        let value = extractor.extract(&chunk, ExtractionCategory::Worldview).unwrap();
        assert_eq!(value["raw_content"], "The world is a flat disc.");
        assert_eq!(value["parsed"], json!(false));
        assert_eq!(value[SEGMENT_METADATA_KEY]["order"], 3);

        let value = extractor.extract(&chunk, ExtractionCategory::Characters).unwrap();
        assert_eq!(value[0]["parsed"], json!(false));
    }

    #[test]
    fn test_empty_result_drops_the_segment() {
        let chunk = Chunk::new("text", 1, 0, 4);
        assert!(extractor(MockProvider::new("{}"))
            .extract(&chunk, ExtractionCategory::Worldview)
            .is_none());
        assert!(extractor(MockProvider::new("[]"))
            .extract(&chunk, ExtractionCategory::Characters)
            .is_none());
    }

    #[test]
    fn test_nameless_characters_keep_raw_text() {
        let response = "[{\"character_name\": \"A\"}]";
        let chunk = Chunk::new("A met B.", 2, 0, 8);

        let value = extractor(MockProvider::new(response))
            .extract(&chunk, ExtractionCategory::Characters)
            .unwrap();

        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["parsed"], false);
        assert_eq!(items[0]["raw_content"], response);
        assert_eq!(SegmentMetadata::from_annotated(&items[0]).unwrap().order, 2);
    }

    #[test]
    fn test_failed_calls_drop_the_segment() {
        let mut provider = MockProvider::default();
        provider.add_error("Segment");
        let extractor = extractor(provider.clone());

        assert!(extractor
            .extract(&Chunk::new("text", 1, 0, 4), ExtractionCategory::Plot)
            .is_none());
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_blank_responses_are_retried() {
        let mut provider = MockProvider::default();
        provider.add_sequence("Segment", vec![Some("  ".to_string()), Some("{\"theme\": \"loss\"}".to_string())]);
        let extractor = extractor(provider.clone());

        let value = extractor
            .extract(&Chunk::new("text", 1, 0, 4), ExtractionCategory::Plot)
            .unwrap();
        assert_eq!(value["theme"], "loss");
        assert_eq!(provider.call_count(), 2);
    }
}
