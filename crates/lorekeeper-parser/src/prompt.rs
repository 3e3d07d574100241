//! Prompt construction
//!
//! Category-specific wording lives in one exhaustive table, so a new
//! category does not compile until it has prompts.

use lorekeeper_domain::ExtractionCategory;

/// Marker opening every merge prompt
pub const MERGE_MARKER: &str = "MERGE TASK";

/// Marker opening the relationship prompt
pub const RELATIONSHIP_MARKER: &str = "RELATIONSHIP ANALYSIS";

struct CategoryProfile {
    marker: &'static str,
    subject: &'static str,
    schema: &'static str,
    merge_rules: &'static str,
}

fn profile(category: ExtractionCategory) -> CategoryProfile {
    match category {
        ExtractionCategory::Worldview => CategoryProfile {
            marker: "WORLDVIEW EXTRACTION",
            subject: "the world the story takes place in",
            schema: r#"{
  "overview": "one-paragraph summary of the world",
  "geography": [{"name": "...", "description": "..."}],
  "history": [{"name": "...", "description": "..."}],
  "technology": [{"name": "...", "description": "..."}],
  "magic_system": [{"name": "...", "description": "..."}],
  "society": [{"name": "...", "description": "..."}],
  "culture": [{"name": "...", "description": "..."}],
  "politics": [{"name": "...", "description": "..."}],
  "economy": [{"name": "...", "description": "..."}],
  "other_elements": [{"name": "...", "description": "..."}]
}"#,
            merge_rules: "Combine identical or overlapping settings, drop repeated facts, keep every distinct detail, and return a single JSON object with the same fields.",
        },
        ExtractionCategory::Characters => CategoryProfile {
            marker: "CHARACTER EXTRACTION",
            subject: "the characters who appear",
            schema: r#"[
  {
    "name": "...",
    "role": "protagonist | supporting | antagonist | minor",
    "background": "...",
    "personality": ["..."],
    "abilities": ["..."],
    "motivation": "...",
    "appearance": "..."
  }
]"#,
            merge_rules: "Characters with the same name are the same person: merge their details into one entry. Keep every distinct character and return a single JSON array.",
        },
        ExtractionCategory::Plot => CategoryProfile {
            marker: "PLOT EXTRACTION",
            subject: "the plot",
            schema: r#"{
  "theme": "...",
  "main_storyline": "...",
  "main_plot_lines": [{"name": "...", "plot_points": [{"event": "...", "significance": "..."}]}],
  "sub_plot_lines": [{"name": "...", "plot_points": [{"event": "...", "significance": "..."}]}],
  "key_plot_points": [{"event": "...", "significance": "..."}],
  "major_conflicts": [{"name": "...", "description": "..."}]
}"#,
            merge_rules: "Keep the storyline coherent and in order, merge similar plot points, drop repetition, and return a single JSON object with the same fields.",
        },
    }
}

/// Heading that identifies extraction prompts for `category`
pub fn extraction_marker(category: ExtractionCategory) -> &'static str {
    profile(category).marker
}

/// Prompt asking for one segment's elements of `category`
pub fn extraction_prompt(category: ExtractionCategory, order: usize, context: &str) -> String {
    let profile = profile(category);
    format!(
        "{marker}\n\
         Read the excerpt below and extract everything it says about {subject}.\n\
         Only report what the text supports. Omit fields you have nothing for.\n\
         Respond with JSON only, in this shape:\n\
         {schema}\n\n\
         Excerpt:\n\
         [Segment {order}] {context}",
        marker = profile.marker,
        subject = profile.subject,
        schema = profile.schema,
        order = order,
        context = context,
    )
}

/// Prompt asking the model to reconcile a group of partial results
pub fn merge_prompt(category: ExtractionCategory, group_json: &str) -> String {
    let profile = profile(category);
    format!(
        "{MERGE_MARKER}: {category}\n\
         The following JSON values were extracted from consecutive parts of one document.\n\
         {rules}\n\
         Respond with JSON only.\n\n\
         {group_json}",
        category = category,
        rules = profile.merge_rules,
        group_json = group_json,
    )
}

/// Prompt asking for the relationship graph between merged characters
pub fn relationship_prompt(characters_json: &str) -> String {
    format!(
        "{RELATIONSHIP_MARKER}\n\
         Given these characters, describe how they relate to each other.\n\
         Respond with JSON only, in this shape:\n\
         {{\"relationships\": [{{\"character1\": \"...\", \"character2\": \"...\", \"type\": \"...\", \"description\": \"...\"}}],\n\
          \"groups\": [{{\"name\": \"...\", \"members\": [\"...\"]}}]}}\n\n\
         Characters:\n\
         {characters_json}",
        characters_json = characters_json,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_embeds_order_and_context() {
        let prompt = extraction_prompt(ExtractionCategory::Plot, 7, "The siege begins.");
        assert!(prompt.starts_with("PLOT EXTRACTION"));
        assert!(prompt.contains("[Segment 7] The siege begins."));
        assert!(prompt.contains("key_plot_points"));
    }

    #[test]
    fn test_markers_are_distinct() {
        let markers: Vec<&str> = ExtractionCategory::ALL.iter().map(|c| extraction_marker(*c)).collect();
        assert_ne!(markers[0], markers[1]);
        assert_ne!(markers[1], markers[2]);
        for marker in &markers {
            assert!(!marker.contains(MERGE_MARKER));
            assert!(!marker.contains(RELATIONSHIP_MARKER));
        }
    }

    #[test]
    fn test_merge_prompt() {
        let prompt = merge_prompt(ExtractionCategory::Characters, "[[{\"name\": \"A\"}]]");
        assert!(prompt.starts_with("MERGE TASK: characters"));
        assert!(prompt.contains("same name"));
        assert!(prompt.ends_with("[[{\"name\": \"A\"}]]"));
        assert!(!prompt.contains("CHARACTER EXTRACTION"));
    }

    #[test]
    fn test_relationship_prompt() {
        let prompt = relationship_prompt("[]");
        assert!(prompt.starts_with(RELATIONSHIP_MARKER));
        assert!(prompt.contains("\"relationships\""));
        assert!(prompt.ends_with("[]"));
    }
}
