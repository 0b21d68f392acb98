//! Persistent script registry commands

use anyhow::Result;

use wb_client::commands::{ScriptEntry, ScriptKind};
use wb_client::BridgeCommands;

use crate::output::{format_scripts, print_json};

/// Execute `scripts list`
pub async fn scripts_list_command(commands: &BridgeCommands, table: bool) -> Result<()> {
    let scripts = commands.get_scripts().await?;
    if table {
        println!("{}", format_scripts(&scripts));
        Ok(())
    } else {
        print_json(&scripts)
    }
}

/// Execute `scripts add`
pub async fn scripts_add_command(
    commands: &BridgeCommands,
    id: &str,
    kind: ScriptKind,
    content: &str,
    window: Option<&str>,
) -> Result<()> {
    anyhow::ensure!(!id.trim().is_empty(), "Script id must not be empty");
    let entry = ScriptEntry {
        id: id.to_string(),
        kind,
        content: content.to_string(),
    };
    let result = commands.register_script(&entry, window).await?;
    print_json(&result)
}

/// Execute `scripts remove`
pub async fn scripts_remove_command(
    commands: &BridgeCommands,
    id: &str,
    window: Option<&str>,
) -> Result<()> {
    let result = commands.remove_script(id, window).await?;
    print_json(&result)
}

/// Execute `scripts clear`
pub async fn scripts_clear_command(commands: &BridgeCommands, window: Option<&str>) -> Result<()> {
    let result = commands.clear_scripts(window).await?;
    print_json(&result)
}
