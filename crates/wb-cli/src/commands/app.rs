//! Commands that query or drive the attached application

use anyhow::Result;
use serde_json::Value;

use wb_client::commands::{ImageFormat, ScreenshotOptions};
use wb_client::BridgeCommands;

use super::parse_json_arg;
use crate::output::{format_windows, print_json};

/// Execute the window-info command
pub async fn window_info_command(commands: &BridgeCommands, window: Option<&str>) -> Result<()> {
    let info = commands.get_window_info(window).await?;
    print_json(&info)
}

/// Execute the backend-state command
pub async fn backend_state_command(commands: &BridgeCommands) -> Result<()> {
    let state = commands.get_backend_state().await?;
    print_json(&state)
}

/// Execute the list-windows command
pub async fn list_windows_command(commands: &BridgeCommands, table: bool) -> Result<()> {
    let windows = commands.list_windows().await?;
    if table {
        println!("{}", format_windows(&windows));
        Ok(())
    } else {
        print_json(&windows)
    }
}

/// Execute the invoke command
pub async fn invoke_command(
    commands: &BridgeCommands,
    command: &str,
    args: Option<&str>,
) -> Result<()> {
    let args = args.map(|raw| parse_json_arg(raw, "--args")).transpose()?;
    let result = commands.execute_command(command, args).await?;
    print_json(&result)
}

/// Execute the emit command
pub async fn emit_command(
    commands: &BridgeCommands,
    event: &str,
    payload: Option<&str>,
) -> Result<()> {
    let payload = match payload {
        Some(raw) => parse_json_arg(raw, "--payload")?,
        None => Value::Null,
    };
    let result = commands.emit_event(event, payload).await?;
    print_json(&result)
}

/// Execute the exec-js command
pub async fn exec_js_command(
    commands: &BridgeCommands,
    script: &str,
    window: Option<&str>,
) -> Result<()> {
    let result = commands.execute_js(script, window).await?;
    print_json(&result)
}

/// Execute the screenshot command
pub async fn screenshot_command(
    commands: &BridgeCommands,
    format: ImageFormat,
    quality: Option<u8>,
    window: Option<String>,
) -> Result<()> {
    if let Some(q) = quality {
        anyhow::ensure!(q <= 100, "Quality must be between 0 and 100");
    }
    let options = ScreenshotOptions {
        format,
        quality,
        window_label: window,
    };
    let result = commands.capture_screenshot(&options).await?;
    print_json(&result)
}
