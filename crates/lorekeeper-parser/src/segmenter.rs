//! Splitting documents into bounded chunks
//!
//! All sizes are in characters, not bytes.

use crate::error::ParserError;
use crate::tokenizer::{AutoTokenizer, WordTokenizer};
use lorekeeper_domain::Chunk;
use tracing::{debug, info, warn};

/// Share of `max_chunk_size` after which a chunk is cut at a word boundary
const BOUNDARY_RATIO: f64 = 0.9;

/// Collapse every run of whitespace into a single space
///
/// Blank input becomes an empty string.
///
/// # Examples
///
/// ```
/// use lorekeeper_parser::preprocess;
///
/// assert_eq!(preprocess("  The  keep\n\n stands. "), "The keep stands.");
/// assert_eq!(preprocess(" \n\t "), "");
/// ```
pub fn preprocess(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte offset of every character, plus the total length
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Splits text into ordered chunks of at most `max_chunk_size` characters
///
/// Every chunk except the last is pulled back to the last word boundary
/// before 90% of the size limit, so words are not cut in half. The cursor
/// then resumes exactly where the chunk ended.
pub struct Segmenter<T = AutoTokenizer> {
    max_chunk_size: usize,
    tokenizer: T,
}

impl Segmenter<AutoTokenizer> {
    /// Create a segmenter using the script-aware default tokenizer
    pub fn new(max_chunk_size: usize) -> Self {
        Self::with_tokenizer(max_chunk_size, AutoTokenizer)
    }
}

impl<T: WordTokenizer> Segmenter<T> {
    /// Create a segmenter with a specific tokenizer
    pub fn with_tokenizer(max_chunk_size: usize, tokenizer: T) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            tokenizer,
        }
    }

    /// Maximum chunk size in characters
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Split `text` into chunks
    ///
    /// Never fails: if the tokenizer errors, the text is sliced at fixed
    /// offsets instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use lorekeeper_parser::Segmenter;
    ///
    /// let chunks = Segmenter::new(12).segment("one two three four five six");
    /// assert!(chunks.len() > 1);
    /// assert_eq!(chunks[0].segment_id, "seg_001");
    /// assert!(chunks.iter().all(|c| c.char_len() <= 12));
    /// ```
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let offsets = char_offsets(text);
        let total = offsets.len() - 1;

        if total <= self.max_chunk_size {
            return vec![Chunk::new(text.trim(), 1, 0, total)];
        }

        let chunks = match self.segment_on_words(text, &offsets) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "Word-aware segmentation failed, slicing at fixed offsets");
                self.segment_fixed(text, &offsets)
            }
        };

        info!(
            chars = total,
            chunks = chunks.len(),
            max_chunk_size = self.max_chunk_size,
            "Segmented document"
        );
        chunks
    }

    fn segment_on_words(&self, text: &str, offsets: &[usize]) -> Result<Vec<Chunk>, ParserError> {
        let total = offsets.len() - 1;
        let limit = self.max_chunk_size as f64 * BOUNDARY_RATIO;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let mut end = (start + self.max_chunk_size).min(total);

            if end < total {
                let window = &text[offsets[start]..offsets[end]];
                let words = self.tokenizer.tokenize(window)?;

                if words.len() > 1 {
                    let mut consumed = 0;
                    for word in words {
                        let len = word.chars().count();
                        if (consumed + len) as f64 > limit {
                            break;
                        }
                        consumed += len;
                    }
                    if consumed > 0 {
                        end = start + consumed;
                    }
                }
            }

            push_chunk(&mut chunks, text, offsets, start, end);
            start = end;
        }

        Ok(chunks)
    }

    fn segment_fixed(&self, text: &str, offsets: &[usize]) -> Vec<Chunk> {
        let total = offsets.len() - 1;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.max_chunk_size).min(total);
            push_chunk(&mut chunks, text, offsets, start, end);
            start = end;
        }

        chunks
    }

    /// Greedily pack whole words into passages of at most `max_len` characters
    ///
    /// Used to feed a similarity index. Words longer than `max_len` are
    /// split. Blank passages are dropped.
    pub fn split_passages(&self, text: &str, max_len: usize) -> Vec<String> {
        let max_len = max_len.max(1);
        let words = match self.tokenizer.tokenize(text) {
            Ok(words) => words,
            Err(e) => {
                debug!(error = %e, "Tokenizer failed, packing characters instead");
                text.split_inclusive(|_: char| true).collect()
            }
        };

        let mut passages = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for word in words {
            let len = word.chars().count();

            if current_len + len > max_len && current_len > 0 {
                flush_passage(&mut passages, &mut current);
                current_len = 0;
            }

            if len > max_len {
                let offsets = char_offsets(word);
                let mut start = 0;
                while start < len {
                    let end = (start + max_len).min(len);
                    passages.push(word[offsets[start]..offsets[end]].to_string());
                    start = end;
                }
                passages.retain(|p| !p.trim().is_empty());
                continue;
            }

            current.push_str(word);
            current_len += len;
        }
        flush_passage(&mut passages, &mut current);

        passages.into_iter().map(|p| p.trim().to_string()).collect()
    }
}

fn flush_passage(passages: &mut Vec<String>, current: &mut String) {
    if !current.trim().is_empty() {
        passages.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, text: &str, offsets: &[usize], start: usize, end: usize) {
    let trimmed = text[offsets[start]..offsets[end]].trim();
    if trimmed.is_empty() {
        return;
    }
    chunks.push(Chunk::new(trimmed, chunks.len() + 1, start, end));
}

/// Pack `text` into passages of at most `max_len` characters with the default tokenizer
pub fn split_passages(text: &str, max_len: usize) -> Vec<String> {
    Segmenter::new(max_len).split_passages(text, max_len)
}
