//! Output formatting utilities for the CLI
//!
//! Results go to stdout as JSON by default so that another process can read
//! them. The table formatters are for people at a terminal. Status lines
//! printed with the `print_*` helpers use color through crossterm.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use wb_client::commands::ScriptEntry;
use wb_core::{Endpoint, IpcEvent};

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", text);
    Ok(())
}

/// Print a value as one compact JSON line and flush
pub fn print_json_line<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string(value).context("Failed to encode output")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}

/// Format discovered endpoints as a table
pub fn format_endpoints(endpoints: &[Endpoint]) -> String {
    if endpoints.is_empty() {
        return "No bridge instances found".to_string();
    }

    #[derive(Tabled)]
    struct EndpointRow {
        #[tabled(rename = "HOST")]
        host: String,
        #[tabled(rename = "PORT")]
        port: u16,
        #[tabled(rename = "URL")]
        url: String,
    }

    let rows: Vec<EndpointRow> = endpoints
        .iter()
        .map(|e| EndpointRow {
            host: e.host().to_string(),
            port: e.port(),
            url: e.ws_url(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the `list_windows` result as a table
///
/// Entries that are not objects are skipped.
pub fn format_windows(windows: &Value) -> String {
    #[derive(Tabled)]
    struct WindowRow {
        #[tabled(rename = "LABEL")]
        label: String,
        #[tabled(rename = "TITLE")]
        title: String,
        #[tabled(rename = "URL")]
        url: String,
        #[tabled(rename = "FOCUSED")]
        focused: String,
        #[tabled(rename = "VISIBLE")]
        visible: String,
    }

    let rows: Vec<WindowRow> = windows
        .as_array()
        .map(|list| {
            list.iter()
                .filter(|w| w.is_object())
                .map(|w| WindowRow {
                    label: text_field(w, "label"),
                    title: text_field(w, "title"),
                    url: truncate(&text_field(w, "url"), 48),
                    focused: flag_field(w, "focused"),
                    visible: flag_field(w, "visible"),
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        return "No windows".to_string();
    }

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format registered scripts as a table
pub fn format_scripts(scripts: &[ScriptEntry]) -> String {
    if scripts.is_empty() {
        return "No registered scripts".to_string();
    }

    #[derive(Tabled)]
    struct ScriptRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "TYPE")]
        kind: String,
        #[tabled(rename = "CONTENT")]
        content: String,
    }

    let rows: Vec<ScriptRow> = scripts
        .iter()
        .map(|s| ScriptRow {
            id: s.id.clone(),
            kind: format!("{:?}", s.kind).to_lowercase(),
            content: truncate(&s.content, 60),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format captured IPC events as a table
pub fn format_ipc_events(events: &[IpcEvent]) -> String {
    if events.is_empty() {
        return "No IPC events captured".to_string();
    }

    #[derive(Tabled)]
    struct IpcRow {
        #[tabled(rename = "TIMESTAMP")]
        timestamp: u64,
        #[tabled(rename = "COMMAND")]
        command: String,
        #[tabled(rename = "DURATION")]
        duration: String,
        #[tabled(rename = "OUTCOME")]
        outcome: String,
    }

    let rows: Vec<IpcRow> = events
        .iter()
        .map(|e| IpcRow {
            timestamp: e.timestamp,
            command: e.command.clone(),
            duration: e
                .duration_ms
                .map(|ms| format!("{:.1}ms", ms))
                .unwrap_or_else(|| "-".to_string()),
            outcome: match &e.error {
                Some(error) => format!("error: {}", truncate(error, 40)),
                None => "ok".to_string(),
            },
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn flag_field(value: &Value, key: &str) -> String {
    match value.get(key).and_then(Value::as_bool) {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => "-".to_string(),
    }
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
///
/// Goes to stderr; stdout carries only command results.
pub fn print_success(msg: &str) {
    print_status(crossterm::style::Color::Green, "✓ ", msg);
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    print_status(crossterm::style::Color::Red, "✗ ", msg);
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    print_status(crossterm::style::Color::Yellow, "⚠ ", msg);
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    print_status(crossterm::style::Color::Cyan, "ℹ ", msg);
}

fn print_status(color: crossterm::style::Color, symbol: &str, msg: &str) {
    use crossterm::style::{Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(color),
        Print(symbol),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
