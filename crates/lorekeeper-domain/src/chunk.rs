//! Document chunks and segment provenance

use serde::{Deserialize, Serialize};

/// Key under which segment provenance is attached to extracted results
pub const SEGMENT_METADATA_KEY: &str = "segment_metadata";

/// One bounded slice of a source document
///
/// Chunks are produced by the segmenter and never modified afterwards.
/// `order` is contiguous and starts at 1. The position fields are character
/// offsets into the (preprocessed) source and are informational only: word
/// boundary adjustment and whitespace trimming mean they do not have to tile
/// the source exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed chunk text
    pub text: String,

    /// 1-based position of this chunk among the retained chunks
    pub order: usize,

    /// Start offset (characters) in the source
    pub start_pos: usize,

    /// End offset (characters, exclusive) in the source
    pub end_pos: usize,

    /// Zero-padded sequence id, e.g. `seg_001`
    pub segment_id: String,
}

impl Chunk {
    /// Create a chunk, deriving the segment id from `order`
    ///
    /// # Examples
    ///
    /// ```
    /// use lorekeeper_domain::Chunk;
    ///
    /// let chunk = Chunk::new("Once upon a time", 7, 0, 16);
    /// assert_eq!(chunk.segment_id, "seg_007");
    /// ```
    pub fn new(text: impl Into<String>, order: usize, start_pos: usize, end_pos: usize) -> Self {
        Self {
            text: text.into(),
            order,
            start_pos,
            end_pos,
            segment_id: segment_id_for(order),
        }
    }

    /// Provenance record attached to every result extracted from this chunk
    pub fn metadata(&self) -> SegmentMetadata {
        SegmentMetadata {
            order: self.order,
            segment_id: self.segment_id.clone(),
        }
    }

    /// Length of the chunk text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Format the segment id for a given order (`seg_001`, `seg_042`, `seg_1234`)
pub fn segment_id_for(order: usize) -> String {
    format!("seg_{:03}", order)
}

/// Traceability record linking an extracted result back to its chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// Order of the originating chunk
    pub order: usize,

    /// Segment id of the originating chunk
    pub segment_id: String,
}

impl SegmentMetadata {
    /// Convert into a JSON value for embedding in extracted results
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "order": self.order,
            "segment_id": self.segment_id,
        })
    }

    /// Read the metadata back out of an annotated result, if present
    pub fn from_annotated(value: &serde_json::Value) -> Option<Self> {
        let meta = value.get(SEGMENT_METADATA_KEY)?;
        serde_json::from_value(meta.clone()).ok()
    }
}
