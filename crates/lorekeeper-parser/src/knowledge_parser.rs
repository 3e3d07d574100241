//! Knowledge parser orchestration
//!
//! Wires the pipeline stages together:
//! preprocess → segment → dispatch → hierarchical merge per category, then
//! relationship analysis over the merged characters, then the artifact.

use crate::config::ParserConfig;
use crate::dispatcher::{Dispatcher, StopHandle};
use crate::error::ParserError;
use crate::extractor::SegmentExtractor;
use crate::merger::HierarchicalMerger;
use crate::relationships::RelationshipAnalyzer;
use crate::retriever::ContextRetriever;
use crate::segmenter::{preprocess, Segmenter};
use crate::structural::fallback_merge_group;
use lorekeeper_domain::{
    Chunk, ExtractionCategory, KnowledgeMetadata, LlmProvider, NoIndex, SimilarityIndex, StructuredKnowledge,
};
use lorekeeper_store::{document_fingerprint, save_knowledge, StageCheckpoint, DEFAULT_KNOWLEDGE_FILE};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Checkpoint stage holding the relationship analysis
const RELATIONSHIPS_STAGE: &str = "relationships";

/// Extracts structured knowledge from long documents
///
/// # Examples
///
/// ```
/// use lorekeeper_llm::MockProvider;
/// use lorekeeper_parser::{KnowledgeParser, ParserConfig};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut provider = MockProvider::new("{}");
/// provider.add_response("WORLDVIEW EXTRACTION", "{\"overview\": \"An island chain\"}");
///
/// let parser = KnowledgeParser::new(Arc::new(provider), ParserConfig::default()).unwrap();
/// let worldview = parser.extract_worldview("The islands drift each winter.").await;
/// assert_eq!(worldview["overview"], "An island chain");
/// # });
/// ```
pub struct KnowledgeParser<L, I = NoIndex> {
    llm: Arc<L>,
    extractor: Arc<SegmentExtractor<L, I>>,
    segmenter: Segmenter,
    dispatcher: Dispatcher,
    merger: HierarchicalMerger<L>,
    relationships: RelationshipAnalyzer<L>,
    config: ParserConfig,
    stop: StopHandle,
    checkpoint_dir: Option<PathBuf>,
}

impl<L> KnowledgeParser<L, NoIndex>
where
    L: LlmProvider + Send + Sync + 'static,
{
    /// Create a parser that uses chunk prefixes as context
    pub fn new(llm: Arc<L>, config: ParserConfig) -> Result<Self, ParserError> {
        Self::build(llm, None, config)
    }
}

impl<L, I> KnowledgeParser<L, I>
where
    L: LlmProvider + Send + Sync + 'static,
    I: SimilarityIndex + Send + Sync + 'static,
{
    /// Create a parser that narrows every chunk through `index`
    pub fn with_index(llm: Arc<L>, index: I, config: ParserConfig) -> Result<Self, ParserError> {
        Self::build(llm, Some(index), config)
    }

    fn build(llm: Arc<L>, index: Option<I>, config: ParserConfig) -> Result<Self, ParserError> {
        config.validate().map_err(ParserError::Config)?;

        let stop = StopHandle::new();
        let retriever = ContextRetriever::new(index, config.context_fallback_chars);
        let extractor = SegmentExtractor::new(Arc::clone(&llm), retriever, config.retry, config.retrieval_top_k);

        Ok(Self {
            extractor: Arc::new(extractor),
            segmenter: Segmenter::new(config.max_chunk_size),
            dispatcher: Dispatcher::new(config.max_concurrency, config.stop_wait(), stop.clone()),
            merger: HierarchicalMerger::new(Arc::clone(&llm), config.merge_group_size, config.retry),
            relationships: RelationshipAnalyzer::new(Arc::clone(&llm), config.retry),
            llm,
            config,
            stop,
            checkpoint_dir: None,
        })
    }

    /// Keep per-stage progress in `dir` so an interrupted run can resume
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Handle for requesting a stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Preprocess (when enabled) and split `text` into chunks
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        if self.config.preprocess_whitespace {
            self.segmenter.segment(&preprocess(text))
        } else {
            self.segmenter.segment(text)
        }
    }

    /// Extract and merge `category` over already segmented chunks
    pub async fn extract_from_chunks(&self, chunks: &[Chunk], category: ExtractionCategory) -> Value {
        let results = self
            .dispatcher
            .dispatch(Arc::clone(&self.extractor), chunks, category)
            .await;

        info!(
            category = %category,
            segments = chunks.len(),
            surviving = results.len(),
            "Merging segment results"
        );

        if self.stop.is_stopped() {
            // no further model calls once a stop was requested
            return fallback_merge_group(category, results);
        }
        self.merger.merge(results, category).await
    }

    /// Run the whole pipeline for one category over raw text
    pub async fn extract_category(&self, text: &str, category: ExtractionCategory) -> Value {
        let chunks = self.segment(text);
        if chunks.is_empty() {
            warn!(category = %category, "Input text is empty, nothing to extract");
            return category.empty_value();
        }
        self.extract_from_chunks(&chunks, category).await
    }

    /// Extract the worldview mapping from `text`
    pub async fn extract_worldview(&self, text: &str) -> Map<String, Value> {
        into_mapping(self.extract_category(text, ExtractionCategory::Worldview).await)
    }

    /// Extract the de-duplicated character list from `text`
    pub async fn extract_characters(&self, text: &str) -> Vec<Value> {
        into_list(self.extract_category(text, ExtractionCategory::Characters).await)
    }

    /// Extract the plot outline mapping from `text`
    pub async fn extract_plot_outline(&self, text: &str) -> Map<String, Value> {
        into_mapping(self.extract_category(text, ExtractionCategory::Plot).await)
    }

    /// Analyze relationships between merged characters
    pub async fn analyze_relationships(&self, characters: &[Value]) -> Map<String, Value> {
        self.relationships.analyze(characters).await
    }

    /// Assemble the final artifact
    pub fn generate_structure(
        &self,
        metadata: KnowledgeMetadata,
        worldview: Map<String, Value>,
        characters: Vec<Value>,
        plot_outline: Map<String, Value>,
        relationships: Map<String, Value>,
    ) -> StructuredKnowledge {
        let knowledge = StructuredKnowledge::new(metadata, worldview, characters, plot_outline, relationships);
        info!(
            extraction_id = %knowledge.metadata.extraction_id,
            worldview_elements = knowledge.statistics.worldview_elements,
            characters = knowledge.statistics.character_count,
            plot_points = knowledge.statistics.plot_points,
            relationships = knowledge.statistics.relationship_count,
            "Knowledge structure generated"
        );
        knowledge
    }

    /// Extract everything from `text`
    ///
    /// The three categories run side by side, then relationships are
    /// analyzed over the merged characters. Returns `None` for blank input,
    /// when every category came back empty, or when a stop was requested.
    /// With a checkpoint directory, stages finished by an earlier run are
    /// reused and the checkpoint is removed once the artifact is built.
    pub async fn parse_document(&self, text: &str, source: Option<&str>) -> Option<StructuredKnowledge> {
        let chunks = self.segment(text);
        if chunks.is_empty() {
            warn!("Input text is empty, skipping extraction");
            return None;
        }

        info!(
            segments = chunks.len(),
            model = self.llm.model_name(),
            max_concurrency = self.dispatcher.max_concurrency(),
            "Parsing document"
        );

        let progress = Progress::open(self.checkpoint_dir.as_deref(), &chunks);

        let (worldview, characters, plot_outline) = tokio::join!(
            self.run_stage(&chunks, ExtractionCategory::Worldview, &progress),
            self.run_stage(&chunks, ExtractionCategory::Characters, &progress),
            self.run_stage(&chunks, ExtractionCategory::Plot, &progress),
        );

        if self.stop.is_stopped() {
            warn!("Stop requested, returning without a result; finished stages are kept");
            return None;
        }

        let worldview = into_mapping(worldview);
        let characters = into_list(characters);
        let plot_outline = into_mapping(plot_outline);

        if worldview.is_empty() && characters.is_empty() && plot_outline.is_empty() {
            warn!(segments = chunks.len(), "No knowledge could be extracted from any segment");
            progress.finish();
            return None;
        }

        let relationships = match progress.reuse(RELATIONSHIPS_STAGE).and_then(|v| v.as_object().cloned()) {
            Some(relationships) => {
                info!("Reusing checkpointed relationships");
                relationships
            }
            None => {
                let relationships = self.analyze_relationships(&characters).await;
                if self.stop.is_stopped() {
                    warn!("Stop requested during relationship analysis");
                    return None;
                }
                progress.record(RELATIONSHIPS_STAGE, Value::Object(relationships.clone()));
                relationships
            }
        };

        let source_files = source.map(|s| vec![s.to_string()]).unwrap_or_default();
        let metadata = KnowledgeMetadata::new(source_files, chunks.len());
        let knowledge = self.generate_structure(metadata, worldview, characters, plot_outline, relationships);

        progress.finish();
        Some(knowledge)
    }

    /// Parse the file at `path` and save the artifact into `out_dir`
    ///
    /// Returns the artifact and the path it was written to, or `None` when
    /// nothing could be extracted.
    pub async fn parse_file(
        &self,
        path: &Path,
        out_dir: &Path,
    ) -> Result<Option<(StructuredKnowledge, PathBuf)>, ParserError> {
        let text = tokio::fs::read_to_string(path).await?;
        let source = path.display().to_string();

        let Some(knowledge) = self.parse_document(&text, Some(&source)).await else {
            return Ok(None);
        };

        let saved = save_knowledge(out_dir, &knowledge, DEFAULT_KNOWLEDGE_FILE)?;
        info!(path = %saved.display(), "Knowledge saved");
        Ok(Some((knowledge, saved)))
    }

    async fn run_stage(&self, chunks: &[Chunk], category: ExtractionCategory, progress: &Progress) -> Value {
        let stage = category.artifact_key();

        if let Some(value) = progress.reuse(stage) {
            if category.matches_shape(&value) {
                info!(category = %category, "Reusing checkpointed stage");
                return value;
            }
            warn!(category = %category, "Checkpointed stage has the wrong shape, extracting again");
        }

        let value = self.extract_from_chunks(chunks, category).await;
        if !self.stop.is_stopped() {
            progress.record(stage, value.clone());
        }
        value
    }
}

fn into_mapping(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Optional checkpoint shared by the concurrently running stages
struct Progress {
    checkpoint: Mutex<Option<StageCheckpoint>>,
}

impl Progress {
    fn open(dir: Option<&Path>, chunks: &[Chunk]) -> Self {
        let checkpoint = dir.and_then(|dir| {
            let fingerprint = document_fingerprint(chunks.iter().map(|chunk| chunk.text.as_str()));
            match StageCheckpoint::open(dir, &fingerprint) {
                Ok(checkpoint) => Some(checkpoint),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Could not open checkpoint, running without one");
                    None
                }
            }
        });

        Self {
            checkpoint: Mutex::new(checkpoint),
        }
    }

    fn reuse(&self, stage: &str) -> Option<Value> {
        let guard = self.checkpoint.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref()?.get(stage).cloned()
    }

    fn record(&self, stage: &str, value: Value) {
        let mut guard = self.checkpoint.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(checkpoint) = guard.as_mut() {
            if let Err(e) = checkpoint.record(stage, value) {
                warn!(stage, error = %e, "Could not write checkpoint");
            }
        }
    }

    fn finish(self) {
        let checkpoint = self.checkpoint.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Some(checkpoint) = checkpoint {
            let path = checkpoint.path().to_path_buf();
            if let Err(e) = checkpoint.finish() {
                warn!(path = %path.display(), error = %e, "Could not remove checkpoint");
            }
        }
    }
}
