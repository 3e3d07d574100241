//! The final structured knowledge artifact

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current artifact format version
pub const EXTRACTION_VERSION: &str = "1.0";

/// Worldview list fields rendered into prompt context, with their labels
const WORLDVIEW_SECTIONS: [(&str, &str); 9] = [
    ("geography", "Geography"),
    ("history", "History"),
    ("technology", "Technology"),
    ("society", "Society"),
    ("culture", "Culture"),
    ("magic_system", "Magic system"),
    ("politics", "Politics"),
    ("economy", "Economy"),
    ("other_elements", "Other"),
];

/// Provenance of an extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMetadata {
    /// UUIDv7 identifying the extraction run
    #[serde(default)]
    pub extraction_id: String,

    /// Unix timestamp (seconds) when the artifact was built
    #[serde(default)]
    pub extracted_at: u64,

    /// Source documents the knowledge was extracted from
    #[serde(default)]
    pub source_files: Vec<String>,

    /// Artifact format version
    #[serde(default = "default_version")]
    pub extraction_version: String,

    /// Number of segments the source was split into
    #[serde(default)]
    pub segment_count: usize,
}

fn default_version() -> String {
    EXTRACTION_VERSION.to_string()
}

impl KnowledgeMetadata {
    /// Metadata for a fresh extraction run started now
    pub fn new(source_files: Vec<String>, segment_count: usize) -> Self {
        Self {
            extraction_id: uuid::Uuid::now_v7().to_string(),
            extracted_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            source_files,
            extraction_version: default_version(),
            segment_count,
        }
    }
}

impl Default for KnowledgeMetadata {
    fn default() -> Self {
        Self {
            extraction_id: String::new(),
            extracted_at: 0,
            source_files: Vec::new(),
            extraction_version: default_version(),
            segment_count: 0,
        }
    }
}

/// Counts derived from the other artifact fields
///
/// Never trusted from disk; always recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Total entries across all list-valued worldview fields
    pub worldview_elements: usize,
    /// Number of characters
    pub character_count: usize,
    /// Plot points, including those nested in plot lines
    pub plot_points: usize,
    /// Entries in `relationships.relationships`
    pub relationship_count: usize,
}

impl Statistics {
    /// Compute statistics from artifact fields
    pub fn compute(
        worldview: &Map<String, Value>,
        characters: &[Value],
        plot_outline: &Map<String, Value>,
        relationships: &Map<String, Value>,
    ) -> Self {
        let worldview_elements = worldview
            .values()
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum();

        let nested_points: usize = ["main_plot_lines", "sub_plot_lines"]
            .iter()
            .filter_map(|key| plot_outline.get(*key).and_then(Value::as_array))
            .flatten()
            .map(|line| list_len(line.get("plot_points")))
            .sum();

        Self {
            worldview_elements,
            character_count: characters.len(),
            plot_points: list_len(plot_outline.get("plot_points"))
                + list_len(plot_outline.get("key_plot_points"))
                + nested_points,
            relationship_count: list_len(relationships.get("relationships")),
        }
    }
}

fn list_len(value: Option<&Value>) -> usize {
    value.and_then(Value::as_array).map_or(0, Vec::len)
}

/// The complete structured knowledge extracted from a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredKnowledge {
    /// Run provenance
    #[serde(default)]
    pub metadata: KnowledgeMetadata,

    /// Merged worldview mapping
    #[serde(default)]
    pub worldview: Map<String, Value>,

    /// Merged, name-unique character list
    #[serde(default)]
    pub characters: Vec<Value>,

    /// Merged plot outline mapping
    #[serde(default)]
    pub plot_outline: Map<String, Value>,

    /// Relationship graph produced from the merged characters
    #[serde(default)]
    pub relationships: Map<String, Value>,

    /// Derived counts
    #[serde(default)]
    pub statistics: Statistics,
}

impl StructuredKnowledge {
    /// Assemble an artifact and compute its statistics
    pub fn new(
        metadata: KnowledgeMetadata,
        worldview: Map<String, Value>,
        characters: Vec<Value>,
        plot_outline: Map<String, Value>,
        relationships: Map<String, Value>,
    ) -> Self {
        let mut knowledge = Self {
            metadata,
            worldview,
            characters,
            plot_outline,
            relationships,
            statistics: Statistics::default(),
        };
        knowledge.recompute_statistics();
        knowledge
    }

    /// Recompute `statistics` from the other fields
    pub fn recompute_statistics(&mut self) {
        self.statistics = Statistics::compute(
            &self.worldview,
            &self.characters,
            &self.plot_outline,
            &self.relationships,
        );
    }

    /// True when no category produced anything
    pub fn is_empty(&self) -> bool {
        self.worldview.is_empty() && self.characters.is_empty() && self.plot_outline.is_empty()
    }

    /// Find a character entry by exact name
    pub fn character_by_name(&self, name: &str) -> Option<&Value> {
        self.characters
            .iter()
            .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
    }

    /// Render a compact text digest suitable for embedding in generation prompts
    ///
    /// Long sections are capped: three elements per worldview section, five
    /// characters, three personality traits and three conflicts.
    pub fn to_prompt_context(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !self.worldview.is_empty() {
            sections.push("=== Worldview ===".to_string());
            if let Some(overview) = non_empty_str(self.worldview.get("overview")) {
                sections.push(format!("Overview: {}", overview));
            }
            for (key, label) in WORLDVIEW_SECTIONS {
                let Some(elements) = self.worldview.get(key).and_then(Value::as_array) else {
                    continue;
                };
                if elements.is_empty() {
                    continue;
                }
                sections.push(format!("\n{}:", label));
                for element in elements.iter().take(3) {
                    sections.push(format!("- {}", describe_element(element)));
                }
            }
        }

        if !self.characters.is_empty() {
            sections.push("\n=== Characters ===".to_string());
            for character in self.characters.iter().take(5) {
                let Some(name) = non_empty_str(character.get("name")) else {
                    continue;
                };
                let role = non_empty_str(character.get("role")).unwrap_or("");
                sections.push(format!("\n{} ({}):", name, role));
                if let Some(background) = non_empty_str(character.get("background")) {
                    sections.push(format!("  Background: {}", background));
                }
                if let Some(traits) = character.get("personality").and_then(Value::as_array) {
                    let traits: Vec<&str> = traits.iter().filter_map(Value::as_str).take(3).collect();
                    if !traits.is_empty() {
                        sections.push(format!("  Personality: {}", traits.join(", ")));
                    }
                }
                if let Some(motivation) = non_empty_str(character.get("motivation")) {
                    sections.push(format!("  Motivation: {}", motivation));
                }
            }
        }

        if !self.plot_outline.is_empty() {
            sections.push("\n=== Plot ===".to_string());
            if let Some(theme) = non_empty_str(self.plot_outline.get("theme")) {
                sections.push(format!("Theme: {}", theme));
            }
            if let Some(storyline) = non_empty_str(self.plot_outline.get("main_storyline")) {
                sections.push(format!("Main storyline: {}", storyline));
            }
            if let Some(conflicts) = self.plot_outline.get("major_conflicts").and_then(Value::as_array) {
                let lines: Vec<String> = conflicts
                    .iter()
                    .take(3)
                    .filter_map(|c| {
                        let name = non_empty_str(c.get("name"))?;
                        let description = non_empty_str(c.get("description"))?;
                        Some(format!("- {}: {}", name, description))
                    })
                    .collect();
                if !lines.is_empty() {
                    sections.push("\nMajor conflicts:".to_string());
                    sections.extend(lines);
                }
            }
        }

        sections.join("\n")
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn describe_element(element: &Value) -> String {
    match element {
        Value::String(s) => s.clone(),
        Value::Object(_) => format!(
            "{}: {}",
            non_empty_str(element.get("name")).unwrap_or(""),
            non_empty_str(element.get("description")).unwrap_or("")
        ),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn sample() -> StructuredKnowledge {
        StructuredKnowledge::new(
            KnowledgeMetadata::new(vec!["novel.txt".to_string()], 3),
            as_map(json!({
                "overview": "A drowned continent",
                "geography": [{"name": "Saltreach", "description": "tidal city"}, {"name": "The Deep"}],
                "history": ["The flood"],
                "name": "Aqua"
            })),
            vec![
                json!({"name": "Mira", "role": "protagonist", "personality": ["stubborn", "kind", "curious", "loud"]}),
                json!({"name": "Oren", "role": "rival"}),
            ],
            as_map(json!({
                "theme": "memory",
                "key_plot_points": [{"name": "The breach"}],
                "main_plot_lines": [{"name": "main", "plot_points": [{}, {}]}],
                "sub_plot_lines": [{"name": "side", "plot_points": [{}]}],
                "major_conflicts": [{"name": "Tide war", "description": "cities fight over dry land"}]
            })),
            as_map(json!({"relationships": [{"character1": "Mira", "character2": "Oren"}]})),
        )
    }

    #[test]
    fn test_statistics_are_computed_on_construction() {
        let knowledge = sample();
        assert_eq!(knowledge.statistics.worldview_elements, 3);
        assert_eq!(knowledge.statistics.character_count, 2);
        assert_eq!(knowledge.statistics.plot_points, 4);
        assert_eq!(knowledge.statistics.relationship_count, 1);
    }

    #[test]
    fn test_statistics_of_empty_artifact() {
        let knowledge = StructuredKnowledge::default();
        assert_eq!(knowledge.statistics, Statistics::default());
        assert!(knowledge.is_empty());
    }

    #[test]
    fn test_recompute_replaces_stale_statistics() {
        let mut knowledge = sample();
        knowledge.statistics.character_count = 99;
        knowledge.recompute_statistics();
        assert_eq!(knowledge.statistics.character_count, 2);
    }

    #[test]
    fn test_serialized_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        for key in ["metadata", "worldview", "characters", "plot_outline", "relationships", "statistics"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["statistics"]["character_count"], 2);
    }

    #[test]
    fn test_character_by_name() {
        let knowledge = sample();
        assert_eq!(knowledge.character_by_name("Oren").unwrap()["role"], "rival");
        assert!(knowledge.character_by_name("Nobody").is_none());
    }

    #[test]
    fn test_prompt_context_sections() {
        let context = sample().to_prompt_context();
        assert!(context.contains("=== Worldview ==="));
        assert!(context.contains("Overview: A drowned continent"));
        assert!(context.contains("- Saltreach: tidal city"));
        assert!(context.contains("- The flood"));
        assert!(context.contains("Mira (protagonist):"));
        assert!(context.contains("Personality: stubborn, kind, curious"));
        assert!(!context.contains("loud"));
        assert!(context.contains("Theme: memory"));
        assert!(context.contains("- Tide war: cities fight over dry land"));
    }

    #[test]
    fn test_prompt_context_of_empty_artifact() {
        assert_eq!(StructuredKnowledge::default().to_prompt_context(), "");
    }

    #[test]
    fn test_metadata_defaults_when_missing() {
        let knowledge: StructuredKnowledge = serde_json::from_str(r#"{"characters": [{"name": "A"}]}"#).unwrap();
        assert_eq!(knowledge.metadata.extraction_version, EXTRACTION_VERSION);
        assert_eq!(knowledge.characters.len(), 1);
        assert!(knowledge.worldview.is_empty());
    }

    #[test]
    fn test_new_metadata_has_run_id() {
        let metadata = KnowledgeMetadata::new(Vec::new(), 0);
        assert!(uuid::Uuid::parse_str(&metadata.extraction_id).is_ok());
        assert!(metadata.extracted_at > 0);
    }
}
