//! `sqlmagic tools` - print the tool catalog.

use anyhow::Result;
use sqlmagic_mcp::ToolRegistry;

pub fn list() -> Result<()> {
    let registry = ToolRegistry::builtin();
    let tools: Vec<_> = registry.list().into_iter().cloned().collect();
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}
