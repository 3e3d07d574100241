//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lorekeeper - Extract worldview, characters and plot from long documents.
#[derive(Debug, Parser)]
#[command(name = "lorekeeper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LOREKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Human-readable text (default)
    Text,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract knowledge from a document and save the artifact
    Parse(ParseArgs),

    /// Show statistics of a saved artifact
    Stats(ArtifactArgs),

    /// Print the prompt-context digest of a saved artifact
    Context(ArtifactArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the parse command.
#[derive(Debug, Parser)]
pub struct ParseArgs {
    /// Document to parse
    pub file: PathBuf,

    /// Directory the artifact is written to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Keep per-stage progress in the output directory and resume from it
    #[arg(long)]
    pub checkpoint: bool,

    /// Index the document into passages and extract from retrieved context.
    ///
    /// Each chunk's own text is then replaced by the passages that best
    /// match the category query, taken from anywhere in the document.
    /// Without this flag every chunk is read from its own first 2000
    /// characters.
    #[arg(long)]
    pub index: bool,

    /// Start from a parser preset instead of the configured values
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Override the number of segments extracted at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override the maximum chunk size (characters)
    #[arg(long)]
    pub max_chunk_size: Option<usize>,
}

/// Arguments for commands that read a saved artifact.
#[derive(Debug, Parser)]
pub struct ArtifactArgs {
    /// Path to an extracted knowledge JSON file
    pub artifact: PathBuf,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub save: bool,
}

/// Parser preset argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PresetArg {
    /// Balanced defaults
    Default,
    /// Wider fan-out, fewer retries
    Fast,
    /// Smaller chunks, more context, more retries
    Thorough,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Text => crate::config::OutputFormat::Text,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<PresetArg> for lorekeeper_parser::ParserConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => lorekeeper_parser::ParserConfig::default(),
            PresetArg::Fast => lorekeeper_parser::ParserConfig::fast(),
            PresetArg::Thorough => lorekeeper_parser::ParserConfig::thorough(),
        }
    }
}
