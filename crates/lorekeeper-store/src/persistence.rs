//! JSON persistence of the final artifact

use crate::StoreError;
use lorekeeper_domain::StructuredKnowledge;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name used when the caller has no preference
pub const DEFAULT_KNOWLEDGE_FILE: &str = "extracted_knowledge.json";

/// Write `knowledge` to `dir/filename` as indented UTF-8 JSON
///
/// Statistics are recomputed before writing. The directory is created when
/// missing. Returns the path written.
pub fn save_knowledge(dir: &Path, knowledge: &StructuredKnowledge, filename: &str) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir)?;

    let mut knowledge = knowledge.clone();
    knowledge.recompute_statistics();

    let path = dir.join(filename);
    fs::write(&path, serde_json::to_string_pretty(&knowledge)?)?;

    info!(
        path = %path.display(),
        characters = knowledge.statistics.character_count,
        plot_points = knowledge.statistics.plot_points,
        "Saved knowledge"
    );
    Ok(path)
}

/// Load an artifact, ignoring its stored statistics
pub fn load_knowledge(path: &Path) -> Result<StructuredKnowledge, StoreError> {
    let text = fs::read_to_string(path)?;
    let mut knowledge: StructuredKnowledge = serde_json::from_str(&text)?;
    knowledge.recompute_statistics();
    Ok(knowledge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeeper_domain::{KnowledgeMetadata, Statistics};
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn sample() -> StructuredKnowledge {
        StructuredKnowledge::new(
            KnowledgeMetadata::new(vec!["book.txt".to_string()], 2),
            as_map(json!({"geography": ["north", "south"], "history": ["war"]})),
            vec![json!({"name": "A"}), json!({"name": "B"})],
            as_map(json!({"plot_points": [{"event": "meet"}], "main_plot_lines": [{"plot_points": [1, 2]}]})),
            as_map(json!({"relationships": [{"character1": "A", "character2": "B"}]})),
        )
    }

    #[test]
    fn test_round_trip_preserves_counts() {
        let dir = TempDir::new().unwrap();
        let knowledge = sample();

        let path = save_knowledge(dir.path(), &knowledge, DEFAULT_KNOWLEDGE_FILE).unwrap();
        let loaded = load_knowledge(&path).unwrap();

        assert_eq!(loaded.statistics, knowledge.statistics);
        assert_eq!(loaded.statistics.character_count, 2);
        assert_eq!(loaded.statistics.worldview_elements, 3);
        assert_eq!(loaded.statistics.plot_points, 3);
        assert_eq!(loaded.metadata.extraction_id, knowledge.metadata.extraction_id);
    }

    #[test]
    fn test_saved_file_is_indented_with_expected_keys() {
        let dir = TempDir::new().unwrap();
        let path = save_knowledge(dir.path(), &sample(), "out.json").unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert!(text.contains("\n  \"metadata\""));
        let value: Value = serde_json::from_str(&text).unwrap();
        for key in ["metadata", "worldview", "characters", "plot_outline", "relationships", "statistics"] {
            assert!(value.get(key).is_some());
        }
    }

    #[test]
    fn test_stale_statistics_are_recomputed_on_save() {
        let dir = TempDir::new().unwrap();
        let mut knowledge = sample();
        knowledge.statistics = Statistics::default();

        let path = save_knowledge(dir.path(), &knowledge, "out.json").unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["statistics"]["character_count"], 2);
    }

    #[test]
    fn test_stored_statistics_are_not_trusted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tampered.json");
        fs::write(
            &path,
            r#"{"characters": [{"name": "A"}], "statistics": {"worldview_elements": 7, "character_count": 40, "plot_points": 9, "relationship_count": 3}}"#,
        )
        .unwrap();

        let loaded = load_knowledge(&path).unwrap();
        assert_eq!(loaded.statistics.character_count, 1);
        assert_eq!(loaded.statistics.relationship_count, 0);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = save_knowledge(&nested, &sample(), DEFAULT_KNOWLEDGE_FILE).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_knowledge(&path), Err(StoreError::Json(_))));
    }
}
