//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use lorekeeper_domain::StructuredKnowledge;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the statistics of an artifact.
    pub fn format_statistics(&self, knowledge: &StructuredKnowledge) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_statistics_json(knowledge),
            OutputFormat::Text => Ok(self.format_statistics_table(knowledge)),
        }
    }

    fn format_statistics_json(&self, knowledge: &StructuredKnowledge) -> Result<String> {
        let value = serde_json::json!({
            "metadata": knowledge.metadata,
            "statistics": knowledge.statistics,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }

    fn format_statistics_table(&self, knowledge: &StructuredKnowledge) -> String {
        let stats = &knowledge.statistics;
        let meta = &knowledge.metadata;

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["Extraction ID".to_string(), meta.extraction_id.clone()]);
        builder.push_record(["Sources".to_string(), meta.source_files.join(", ")]);
        builder.push_record(["Segments".to_string(), meta.segment_count.to_string()]);
        builder.push_record(["Worldview elements".to_string(), stats.worldview_elements.to_string()]);
        builder.push_record(["Characters".to_string(), stats.character_count.to_string()]);
        builder.push_record(["Plot points".to_string(), stats.plot_points.to_string()]);
        builder.push_record(["Relationships".to_string(), stats.relationship_count.to_string()]);

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format the prompt-context digest of an artifact.
    pub fn format_context(&self, knowledge: &StructuredKnowledge) -> Result<String> {
        let context = knowledge.to_prompt_context();
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({ "context": context }))?),
            OutputFormat::Text if context.is_empty() => Ok(self.warning("Artifact holds no knowledge.")),
            OutputFormat::Text => Ok(context),
        }
    }

    /// Format the result of a parse run.
    pub fn parse_result(&self, knowledge: &StructuredKnowledge, path: &Path) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "artifact": path.display().to_string(),
                    "statistics": knowledge.statistics,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Text => Ok(format!(
                "{}\n{}",
                self.success(&format!("Knowledge saved to {}", path.display())),
                self.format_statistics_table(knowledge)
            )),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
