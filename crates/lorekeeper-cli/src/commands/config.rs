//! Config command implementation.

use crate::cli::ConfigArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
pub async fn execute_config(
    args: ConfigArgs,
    config: &Config,
    config_path: Option<&Path>,
    formatter: &Formatter,
) -> Result<()> {
    if args.save {
        let path = config.save(config_path)?;
        println!("{}", formatter.success(&format!("Configuration written to {}", path.display())));
        return Ok(());
    }

    print!("{}", config.to_toml()?);
    Ok(())
}
