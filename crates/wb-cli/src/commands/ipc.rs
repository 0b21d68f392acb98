//! IPC monitor commands

use anyhow::Result;

use wb_client::BridgeCommands;

use crate::output::{format_ipc_events, print_json};

/// Execute `ipc start`
pub async fn ipc_start_command(commands: &BridgeCommands) -> Result<()> {
    let result = commands.start_ipc_monitor().await?;
    print_json(&result)
}

/// Execute `ipc stop`
pub async fn ipc_stop_command(commands: &BridgeCommands) -> Result<()> {
    let result = commands.stop_ipc_monitor().await?;
    print_json(&result)
}

/// Execute `ipc events`
pub async fn ipc_events_command(commands: &BridgeCommands, table: bool) -> Result<()> {
    let events = commands.get_ipc_events().await?;
    if table {
        println!("{}", format_ipc_events(&events));
        Ok(())
    } else {
        print_json(&events)
    }
}
