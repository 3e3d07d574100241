//! Parse command implementation.

use crate::cli::ParseArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use lorekeeper_domain::SimilarityIndex;
use lorekeeper_llm::AnyProvider;
use lorekeeper_parser::{split_passages, KnowledgeParser, ParserConfig};
use lorekeeper_store::{HashEmbeddingModel, PassageIndex};
use std::sync::Arc;
use tracing::{info, warn};

/// Passage length used when indexing the document for context retrieval
const PASSAGE_CHARS: usize = 500;

/// Execute the parse command.
pub async fn execute_parse(args: ParseArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let parser_config = parser_config(&args, config);
    let llm = Arc::new(config.llm.build()?);

    if !args.index {
        let parser = KnowledgeParser::new(llm, parser_config)?;
        return run(parser, &args, formatter).await;
    }

    let text = tokio::fs::read_to_string(&args.file).await?;
    let index = PassageIndex::from_passages(HashEmbeddingModel::default(), split_passages(&text, PASSAGE_CHARS))?;
    info!(passages = index.len(), "Indexed document");

    let parser = KnowledgeParser::with_index(llm, index, parser_config)?;
    run(parser, &args, formatter).await
}

/// Effective parser settings: preset or configured values, then flag overrides.
fn parser_config(args: &ParseArgs, config: &Config) -> ParserConfig {
    let mut parser_config: ParserConfig = args.preset.map(Into::into).unwrap_or_else(|| config.parser.clone());
    if let Some(concurrency) = args.concurrency {
        parser_config.max_concurrency = concurrency;
    }
    if let Some(size) = args.max_chunk_size {
        parser_config.max_chunk_size = size;
    }
    parser_config
}

async fn run<I>(parser: KnowledgeParser<AnyProvider, I>, args: &ParseArgs, formatter: &Formatter) -> Result<()>
where
    I: SimilarityIndex + Send + Sync + 'static,
{
    let parser = if args.checkpoint {
        parser.with_checkpoint_dir(&args.out)
    } else {
        parser
    };

    let stop = parser.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight segments");
            stop.stop();
        }
    });

    let outcome = parser.parse_file(&args.file, &args.out).await;
    interrupt.abort();

    match outcome? {
        Some((knowledge, path)) => println!("{}", formatter.parse_result(&knowledge, &path)?),
        None if parser.stop_handle().is_stopped() => {
            let message = if args.checkpoint {
                "Run stopped; completed stages are kept for the next run"
            } else {
                "Run stopped; nothing was saved"
            };
            println!("{}", formatter.warning(message));
        }
        None => println!("{}", formatter.warning("Nothing could be extracted from the document")),
    }

    Ok(())
}
