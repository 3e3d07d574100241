//! Pipeline scenario tests

#[cfg(test)]
mod tests {
    use crate::{
        split_passages, ContextRetriever, Dispatcher, KnowledgeParser, ParserConfig, ParserError,
        SegmentExtractor, StopHandle,
    };
    use lorekeeper_domain::{Chunk, ExtractionCategory, NoIndex, SegmentMetadata, StructuredKnowledge};
    use lorekeeper_llm::{MockProvider, RetryPolicy};
    use lorekeeper_store::{
        document_fingerprint, load_knowledge, HashEmbeddingModel, PassageIndex, StageCheckpoint, CHECKPOINT_FILE,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> ParserConfig {
        ParserConfig {
            retry: RetryPolicy::new(3, 0),
            stop_wait_secs: 5,
            ..ParserConfig::default()
        }
    }

    fn parser(provider: &MockProvider, config: ParserConfig) -> KnowledgeParser<MockProvider> {
        KnowledgeParser::new(Arc::new(provider.clone()), config).unwrap()
    }

    /// Checkpoint bound to `text` as `parser` segments it
    fn checkpoint_for(dir: &std::path::Path, parser: &KnowledgeParser<MockProvider>, text: &str) -> StageCheckpoint {
        let chunks = parser.segment(text);
        StageCheckpoint::open(dir, &document_fingerprint(chunks.iter().map(|c| c.text.as_str()))).unwrap()
    }

    fn numbered_chunks(n: usize) -> Vec<Chunk> {
        (1..=n)
            .map(|order| Chunk::new(format!("[chunk-{:02}] text", order), order, 0, 15))
            .collect()
    }

    fn orders(values: &[Value]) -> Vec<usize> {
        values
            .iter()
            .map(|v| SegmentMetadata::from_annotated(v).unwrap().order)
            .collect()
    }

    /// Routes for a single-chunk document producing one of everything
    fn scripted_provider() -> MockProvider {
        let mut provider = MockProvider::new("{}");
        provider.add_response(
            "WORLDVIEW EXTRACTION",
            "{\"overview\": \"A drowned coast\", \"geography\": [{\"name\": \"Saltmarsh\"}]}",
        );
        provider.add_response(
            "CHARACTER EXTRACTION",
            "```json\n[{\"name\": \"Mira\", \"role\": \"protagonist\"}, {\"name\": \"Tor\"}]\n```",
        );
        provider.add_response(
            "PLOT EXTRACTION",
            "{\"theme\": \"loss\", \"key_plot_points\": [{\"event\": \"the flood\"}]}",
        );
        provider.add_response(
            "RELATIONSHIP ANALYSIS",
            "{\"relationships\": [{\"character1\": \"Mira\", \"character2\": \"Tor\", \"type\": \"siblings\"}]}",
        );
        provider
    }

    const DOCUMENT: &str = "Mira and her brother Tor keep the last lighthouse on the drowned coast.";

    #[tokio::test]
    async fn test_three_chunk_worldview_with_one_failure() {
        let mut provider = MockProvider::default();
        provider.add_response("MERGE TASK", "I cannot merge these.");
        provider.add_response("ALPHA", "{\"setting\": \"X\"}");
        provider.add_response("BETA", "{\"setting\": \"Y\"}");
        provider.add_error("GAMMA");

        let chunks = vec![
            Chunk::new("ALPHA chunk", 1, 0, 11),
            Chunk::new("BETA chunk", 2, 11, 21),
            Chunk::new("GAMMA chunk", 3, 21, 32),
        ];

        let merged = parser(&provider, test_config())
            .extract_from_chunks(&chunks, ExtractionCategory::Worldview)
            .await;

        assert!(merged.is_object());
        let setting = merged["setting"].as_str().unwrap();
        assert!(setting.contains('X'));
        assert!(setting.contains('Y'));
        assert_eq!(provider.calls_matching("GAMMA"), 3);
        assert_eq!(provider.calls_matching("MERGE TASK"), 1);
    }

    #[tokio::test]
    async fn test_order_preserved_for_every_concurrency() {
        let chunks = numbered_chunks(6);

        for concurrency in 1..=chunks.len() {
            let mut provider = MockProvider::new("{}").with_latency(Duration::from_millis(2));
            for chunk in &chunks {
                provider.add_response(chunk.text.clone(), format!("{{\"tag\": \"{}\"}}", chunk.segment_id));
            }

            let extractor = Arc::new(SegmentExtractor::new(
                Arc::new(provider.clone()),
                ContextRetriever::<NoIndex>::new(None, 2000),
                RetryPolicy::new(1, 0),
                8,
            ));
            let dispatcher = Dispatcher::new(concurrency, Duration::from_secs(5), StopHandle::new());

            let out = dispatcher
                .dispatch(extractor, &chunks, ExtractionCategory::Plot)
                .await;

            assert_eq!(orders(&out), vec![1, 2, 3, 4, 5, 6], "concurrency {}", concurrency);
            assert_eq!(out[3]["tag"], "seg_004");
        }
    }

    #[tokio::test]
    async fn test_single_failed_segment_is_omitted() {
        let mut provider = MockProvider::new("{\"setting\": \"s\"}");
        provider.add_error("[chunk-04]");

        let extractor = Arc::new(SegmentExtractor::new(
            Arc::new(provider.clone()),
            ContextRetriever::<NoIndex>::new(None, 2000),
            RetryPolicy::new(2, 0),
            8,
        ));
        let dispatcher = Dispatcher::new(3, Duration::from_secs(5), StopHandle::new());

        let out = dispatcher
            .dispatch(extractor, &numbered_chunks(6), ExtractionCategory::Worldview)
            .await;

        assert_eq!(out.len(), 5);
        assert_eq!(orders(&out), vec![1, 2, 3, 5, 6]);
    }

    #[tokio::test]
    async fn test_characters_deduplicated_across_segments() {
        let mut provider = MockProvider::default();
        provider.add_response("MERGE TASK", "not json");
        provider.add_response("first part", "[{\"name\": \"A\", \"age\": 25}]");
        provider.add_response("second part", "[{\"name\": \"A\", \"description\": \"hero\"}, {\"name\": \"B\"}]");

        let config = ParserConfig {
            max_chunk_size: 20,
            ..test_config()
        };
        let parser = parser(&provider, config);
        let text = "first part here.\n\nsecond part here.";
        assert_eq!(parser.segment(text).len(), 2);

        let characters = parser.extract_characters(text).await;
        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0]["name"], "A");
        assert_eq!(characters[0]["age"], 25);
        assert_eq!(characters[0]["description"], "hero");
        assert_eq!(characters[1]["name"], "B");
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let provider = MockProvider::new("{\"setting\": \"X\"}");
        let parser = parser(&provider, test_config());

        assert!(parser.parse_document(" \n\t ", None).await.is_none());
        assert!(parser.extract_worldview("").await.is_empty());
        assert!(parser.extract_characters("   ").await.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_parse_document_builds_artifact() {
        let provider = scripted_provider();
        let parser = parser(&provider, test_config());

        let knowledge = parser.parse_document(DOCUMENT, Some("coast.txt")).await.unwrap();

        assert_eq!(knowledge.worldview["overview"], "A drowned coast");
        assert_eq!(knowledge.characters.len(), 2);
        assert_eq!(knowledge.plot_outline["theme"], "loss");
        assert_eq!(knowledge.relationships["relationships"][0]["type"], "siblings");

        assert_eq!(knowledge.statistics.worldview_elements, 1);
        assert_eq!(knowledge.statistics.character_count, 2);
        assert_eq!(knowledge.statistics.plot_points, 1);
        assert_eq!(knowledge.statistics.relationship_count, 1);

        assert_eq!(knowledge.metadata.source_files, vec!["coast.txt".to_string()]);
        assert_eq!(knowledge.metadata.segment_count, 1);
        assert_eq!(knowledge.metadata.extraction_version, "1.0");
        assert!(!knowledge.metadata.extraction_id.is_empty());

        // one call per category plus the relationship analysis
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_nothing_extracted_returns_none() {
        let provider = MockProvider::new("{}");
        let parser = parser(&provider, test_config());

        assert!(parser.parse_document(DOCUMENT, None).await.is_none());
        assert_eq!(provider.calls_matching("RELATIONSHIP ANALYSIS"), 0);
    }

    #[tokio::test]
    async fn test_parse_file_saves_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("coast.txt");
        std::fs::write(&source, DOCUMENT).unwrap();
        let out_dir = dir.path().join("out");

        let provider = scripted_provider();
        let (knowledge, saved) = parser(&provider, test_config())
            .parse_file(&source, &out_dir)
            .await
            .unwrap()
            .unwrap();

        assert!(saved.starts_with(&out_dir));
        let loaded = load_knowledge(&saved).unwrap();
        assert_eq!(loaded.statistics, knowledge.statistics);
        assert_eq!(loaded.characters, knowledge.characters);
        assert_eq!(loaded.metadata.source_files[0], source.display().to_string());
    }

    #[tokio::test]
    async fn test_parse_file_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("{}");

        let result = parser(&provider, test_config())
            .parse_file(&dir.path().join("missing.txt"), dir.path())
            .await;
        assert!(matches!(result, Err(ParserError::Io(_))));
    }

    #[tokio::test]
    async fn test_completed_checkpoint_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new("{\"overview\": \"fresh\"}");
        let parser = parser(&provider, test_config()).with_checkpoint_dir(dir.path());

        let mut checkpoint = checkpoint_for(dir.path(), &parser, DOCUMENT);
        checkpoint.record("worldview", json!({"overview": "cached world"})).unwrap();
        checkpoint.record("characters", json!([{"name": "Mira"}])).unwrap();
        checkpoint.record("plot_outline", json!({"theme": "cached plot"})).unwrap();
        checkpoint.record("relationships", json!({"relationships": []})).unwrap();

        let knowledge = parser.parse_document(DOCUMENT, None).await.unwrap();

        assert_eq!(provider.call_count(), 0);
        assert_eq!(knowledge.worldview["overview"], "cached world");
        assert_eq!(knowledge.characters[0]["name"], "Mira");
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test]
    async fn test_partial_checkpoint_runs_remaining_stages() {
        let dir = tempfile::tempdir().unwrap();
        let provider = scripted_provider();
        let parser = parser(&provider, test_config()).with_checkpoint_dir(dir.path());

        let mut checkpoint = checkpoint_for(dir.path(), &parser, DOCUMENT);
        checkpoint.record("worldview", json!({"overview": "cached world"})).unwrap();
        checkpoint.record("characters", json!([{"name": "Mira"}])).unwrap();

        let knowledge = parser.parse_document(DOCUMENT, None).await.unwrap();

        assert_eq!(provider.calls_matching("WORLDVIEW EXTRACTION"), 0);
        assert_eq!(provider.calls_matching("CHARACTER EXTRACTION"), 0);
        assert_eq!(provider.calls_matching("PLOT EXTRACTION"), 1);
        assert_eq!(provider.calls_matching("RELATIONSHIP ANALYSIS"), 1);
        assert_eq!(knowledge.worldview["overview"], "cached world");
        assert_eq!(knowledge.plot_outline["theme"], "loss");
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test]
    async fn test_checkpoint_of_another_document_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let provider = scripted_provider();
        let parser = parser(&provider, test_config()).with_checkpoint_dir(dir.path());

        let mut checkpoint = checkpoint_for(dir.path(), &parser, "An entirely different story about a desert.");
        checkpoint.record("worldview", json!({"setting": "FROM DOCUMENT A"})).unwrap();
        checkpoint.record("characters", json!([{"name": "Stranger"}])).unwrap();

        let knowledge = parser.parse_document(DOCUMENT, None).await.unwrap();

        assert_eq!(provider.calls_matching("WORLDVIEW EXTRACTION"), 1);
        assert_eq!(provider.calls_matching("CHARACTER EXTRACTION"), 1);
        assert!(knowledge.worldview.get("setting").is_none());
        assert!(knowledge.character_by_name("Stranger").is_none());
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test]
    async fn test_unfingerprinted_checkpoint_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut legacy = StageCheckpoint::load(dir.path()).unwrap();
        legacy.record("worldview", json!({"setting": "FROM DOCUMENT A"})).unwrap();

        let provider = scripted_provider();
        let parser = parser(&provider, test_config()).with_checkpoint_dir(dir.path());
        let knowledge = parser.parse_document(DOCUMENT, None).await.unwrap();

        assert_eq!(provider.calls_matching("WORLDVIEW EXTRACTION"), 1);
        assert!(knowledge.worldview.get("setting").is_none());
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let provider = scripted_provider();
        let parser = parser(&provider, test_config()).with_checkpoint_dir(dir.path());

        parser.stop_handle().stop();

        assert!(parser.parse_document(DOCUMENT, None).await.is_none());
        assert_eq!(provider.call_count(), 0);
        assert!(!dir.path().join(CHECKPOINT_FILE).exists());
    }

    #[tokio::test]
    async fn test_stop_mid_run_skips_pending_segments() {
        let provider = MockProvider::new("{\"setting\": \"s\"}").with_latency(Duration::from_millis(50));
        let config = ParserConfig {
            max_concurrency: 1,
            ..test_config()
        };
        let parser = parser(&provider, config);
        let chunks = numbered_chunks(8);

        let stop = parser.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            stop.stop();
        });

        let merged = parser
            .extract_from_chunks(&chunks, ExtractionCategory::Worldview)
            .await;

        assert!(merged.is_object());
        let extracted = provider.calls_matching("WORLDVIEW EXTRACTION");
        assert!(extracted >= 1);
        assert!(extracted < chunks.len());
    }

    #[tokio::test]
    async fn test_index_passages_become_context() {
        let text = "The lighthouse keeper counts ships every night. \
                    Far inland the wheat fields burn each summer. \
                    Nobody remembers who built the sea wall.";
        let index = PassageIndex::from_passages(HashEmbeddingModel::new(256), split_passages(text, 50)).unwrap();

        let provider = MockProvider::new("{\"overview\": \"coast\"}");
        let parser = KnowledgeParser::with_index(Arc::new(provider.clone()), index, test_config()).unwrap();

        let worldview = parser.extract_worldview(text).await;
        assert_eq!(worldview["overview"], "coast");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("lighthouse keeper"));
        assert!(prompt.contains("\n\n"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ParserConfig {
            merge_group_size: 1,
            ..ParserConfig::default()
        };
        let result = KnowledgeParser::new(Arc::new(MockProvider::default()), config);
        assert!(matches!(result, Err(ParserError::Config(_))));
    }

    #[test]
    fn test_unknown_category_name() {
        let err: ParserError = "timeline".parse::<ExtractionCategory>().unwrap_err().into();
        assert!(matches!(err, ParserError::UnknownCategory(_)));
        assert!(err.to_string().contains("timeline"));
    }

    #[test]
    fn test_artifact_round_trip_keeps_counts() {
        let dir = tempfile::tempdir().unwrap();
        let knowledge: StructuredKnowledge = serde_json::from_value(json!({
            "worldview": {"geography": [{"name": "Saltmarsh"}, {"name": "Ridge"}]},
            "characters": [{"name": "Mira"}],
            "plot_outline": {"main_plot_lines": [{"plot_points": [{"event": "flood"}]}]},
            "statistics": {"worldview_elements": 99, "character_count": 99, "plot_points": 99, "relationship_count": 99}
        }))
        .unwrap();

        let path = lorekeeper_store::save_knowledge(dir.path(), &knowledge, "k.json").unwrap();
        let loaded = load_knowledge(&path).unwrap();
        assert_eq!(loaded.statistics.worldview_elements, 2);
        assert_eq!(loaded.statistics.character_count, 1);
        assert_eq!(loaded.statistics.plot_points, 1);
    }
}
