//! Lorekeeper CLI - Extract structured story knowledge from long documents.

use clap::Parser;
use lorekeeper_cli::commands;
use lorekeeper_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> lorekeeper_cli::Result<()> {
    let cli = Cli::parse();

    // Log to stderr so JSON output on stdout stays clean
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config_path = cli.config.as_deref();
    let config = Config::load(config_path)?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Parse(args) => commands::execute_parse(args, &config, &formatter).await?,
        Command::Stats(args) => commands::execute_stats(args, &formatter).await?,
        Command::Context(args) => commands::execute_context(args, &formatter).await?,
        Command::Config(args) => commands::execute_config(args, &config, config_path, &formatter).await?,
    }

    Ok(())
}
