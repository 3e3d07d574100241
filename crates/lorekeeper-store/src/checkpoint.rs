//! Resumability file for multi-stage runs
//!
//! A JSON object keyed by stage name, rewritten after every completed
//! stage. A rerun after a crash loads it and skips the stages already
//! present. The file is removed once the whole run finishes.
//!
//! The file also carries a fingerprint of the segmented source document, so
//! a checkpoint left behind by one document is never reused for another.

use crate::StoreError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Checkpoint file name inside the checkpoint directory
pub const CHECKPOINT_FILE: &str = "partial_knowledge.json";

/// Reserved key holding the source fingerprint; never a stage name
pub const SOURCE_KEY: &str = "source_fingerprint";

/// Stable fingerprint of a segmented document
///
/// Hashes every segment text in order together with the segment count, so
/// the same text segmented under a different size limit differs too.
pub fn document_fingerprint<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    let mut count: u64 = 0;
    for segment in segments {
        hasher.update(segment.as_bytes());
        hasher.update([0u8]);
        count += 1;
    }
    hasher.update(count.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Partial results of a run, keyed by stage
///
/// # Examples
///
/// ```
/// use lorekeeper_store::StageCheckpoint;
/// use serde_json::json;
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut checkpoint = StageCheckpoint::load(dir.path()).unwrap();
/// checkpoint.record("worldview", json!({"setting": "X"})).unwrap();
///
/// let reloaded = StageCheckpoint::load(dir.path()).unwrap();
/// assert!(reloaded.is_complete("worldview"));
/// reloaded.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct StageCheckpoint {
    path: PathBuf,
    stages: Map<String, Value>,
}

impl StageCheckpoint {
    /// Load the checkpoint in `dir`
    ///
    /// A missing file yields an empty checkpoint. A corrupt file is logged
    /// and also treated as empty; it is overwritten on the next `record`.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(CHECKPOINT_FILE);

        let stages = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(stages)) => {
                    info!(path = %path.display(), stages = stages.len(), "Resuming from checkpoint");
                    stages
                }
                Ok(_) => {
                    warn!(path = %path.display(), "Checkpoint is not a JSON object, starting fresh");
                    Map::new()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt checkpoint, starting fresh");
                    Map::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, stages })
    }

    /// Load the checkpoint in `dir` for the document with `fingerprint`
    ///
    /// Stages recorded for a different document, or by a file without a
    /// fingerprint, are discarded. The fingerprint is written along with
    /// the next `record`.
    pub fn open(dir: &Path, fingerprint: &str) -> Result<Self, StoreError> {
        let mut checkpoint = Self::load(dir)?;

        let recorded = checkpoint.source().map(str::to_string);
        let stale = match recorded.as_deref() {
            Some(recorded) => recorded != fingerprint,
            None => checkpoint.completed_stages().next().is_some(),
        };
        if stale {
            warn!(
                path = %checkpoint.path.display(),
                recorded = recorded.as_deref().unwrap_or("none"),
                "Checkpoint belongs to a different document, starting fresh"
            );
            checkpoint.stages.clear();
        }

        checkpoint
            .stages
            .insert(SOURCE_KEY.to_string(), Value::String(fingerprint.to_string()));
        Ok(checkpoint)
    }

    /// Location of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fingerprint of the document the stages belong to
    pub fn source(&self) -> Option<&str> {
        self.stages.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// Result recorded for `stage`
    pub fn get(&self, stage: &str) -> Option<&Value> {
        if stage == SOURCE_KEY {
            return None;
        }
        self.stages.get(stage)
    }

    /// Whether `stage` has a recorded result
    pub fn is_complete(&self, stage: &str) -> bool {
        self.get(stage).is_some()
    }

    /// Names of completed stages
    pub fn completed_stages(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str).filter(|key| *key != SOURCE_KEY)
    }

    /// Record `value` for `stage` and write the file immediately
    pub fn record(&mut self, stage: &str, value: Value) -> Result<(), StoreError> {
        self.stages.insert(stage.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.stages)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(stage, path = %self.path.display(), "Checkpoint recorded");
        Ok(())
    }

    /// Remove the checkpoint file once every stage is done
    pub fn finish(self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Checkpoint removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
