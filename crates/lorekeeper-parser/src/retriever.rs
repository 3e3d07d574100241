//! Context retrieval for a segment

use lorekeeper_domain::SimilarityIndex;
use tracing::{debug, warn};

/// Narrows a chunk to the context handed to the extraction prompt
///
/// With no index the context is a fixed-length prefix of the chunk. With an
/// index it is the top passages for the category query, joined by blank
/// lines. Index failures and empty hits fall back to the prefix.
pub struct ContextRetriever<I> {
    index: Option<I>,
    fallback_chars: usize,
}

impl<I: SimilarityIndex> ContextRetriever<I> {
    /// Create a retriever; `None` means always use the prefix
    pub fn new(index: Option<I>, fallback_chars: usize) -> Self {
        Self { index, fallback_chars }
    }

    /// Whether a similarity index is attached
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Context for `chunk_text` given the category `query`
    pub fn retrieve(&self, chunk_text: &str, query: &str, top_k: usize) -> String {
        let Some(index) = &self.index else {
            return self.prefix(chunk_text);
        };

        match index.search(query, top_k) {
            Ok(passages) if !passages.is_empty() => {
                debug!(passages = passages.len(), "Retrieved context passages");
                passages.join("\n\n")
            }
            Ok(_) => {
                debug!("Similarity search returned nothing, using chunk prefix");
                self.prefix(chunk_text)
            }
            Err(e) => {
                warn!(error = %e, "Similarity search failed, using chunk prefix");
                self.prefix(chunk_text)
            }
        }
    }

    fn prefix(&self, text: &str) -> String {
        match text.char_indices().nth(self.fallback_chars) {
            Some((byte, _)) => text[..byte].to_string(),
            None => text.to_string(),
        }
    }
}
