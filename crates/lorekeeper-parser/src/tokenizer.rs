//! Word boundary detection
//!
//! CJK text goes through jieba's dictionary segmenter; everything else is
//! split on whitespace. Tokenizers return slices of the input that
//! concatenate back to exactly the input, so token lengths can be summed to
//! find a boundary offset.

use crate::error::ParserError;
use jieba_rs::Jieba;
use std::sync::OnceLock;

/// Splits text into word tokens covering the whole input
pub trait WordTokenizer: Send + Sync {
    /// Tokenize `text`; the tokens concatenate back to `text`
    fn tokenize<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ParserError>;
}

/// Whether `text` contains any CJK ideographs, kana or hangul
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{3040}'..='\u{30FF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{F900}'..='\u{FAFF}')
    })
}

fn ensure_covers(text: &str, tokens: &[&str]) -> Result<(), ParserError> {
    let covered: usize = tokens.iter().map(|t| t.len()).sum();
    if covered != text.len() {
        return Err(ParserError::Tokenizer(format!(
            "tokens cover {} of {} bytes",
            covered,
            text.len()
        )));
    }
    Ok(())
}

/// Dictionary-based segmenter for Chinese text
///
/// The dictionary is loaded once per process on first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiebaTokenizer;

impl JiebaTokenizer {
    fn jieba() -> &'static Jieba {
        static JIEBA: OnceLock<Jieba> = OnceLock::new();
        JIEBA.get_or_init(Jieba::new)
    }
}

impl WordTokenizer for JiebaTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ParserError> {
        let tokens = Self::jieba().cut(text, false);
        ensure_covers(text, &tokens)?;
        Ok(tokens)
    }
}

/// Splits after each whitespace character, keeping it on the preceding word
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl WordTokenizer for WhitespaceTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ParserError> {
        Ok(text.split_inclusive(char::is_whitespace).collect())
    }
}

/// Picks jieba for CJK text and whitespace splitting otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoTokenizer;

impl WordTokenizer for AutoTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ParserError> {
        if contains_cjk(text) {
            JiebaTokenizer.tokenize(text)
        } else {
            WhitespaceTokenizer.tokenize(text)
        }
    }
}
