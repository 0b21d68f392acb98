//! CLI command implementations

mod app;
mod config;
mod ipc;
mod scripts;
mod session;
mod watch;

pub use app::{
    backend_state_command, emit_command, exec_js_command, invoke_command, list_windows_command,
    screenshot_command, window_info_command,
};
pub use config::{config_get, config_init, config_path, config_show};
pub use ipc::{ipc_events_command, ipc_start_command, ipc_stop_command};
pub use scripts::{
    scripts_add_command, scripts_clear_command, scripts_list_command, scripts_remove_command,
};
pub use session::{discover_command, status_command, BridgeSession};
pub use watch::watch_command;

use anyhow::{Context, Result};
use serde_json::Value;

/// Parse a JSON argument given on the command line
pub(crate) fn parse_json_arg(raw: &str, what: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON: {}", what, raw))
}
