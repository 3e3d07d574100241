//! Context command implementation.

use crate::cli::ArtifactArgs;
use crate::error::Result;
use crate::output::Formatter;
use lorekeeper_store::load_knowledge;

/// Execute the context command.
pub async fn execute_context(args: ArtifactArgs, formatter: &Formatter) -> Result<()> {
    let knowledge = load_knowledge(&args.artifact)?;
    println!("{}", formatter.format_context(&knowledge)?);
    Ok(())
}
