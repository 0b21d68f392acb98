//! wb-cli: Command-line interface for the webview bridge
//!
//! Provides the `webview-bridge` CLI, which attaches to a running Tauri
//! application, performs one command and prints the result as JSON.

pub mod commands;
pub mod output;
pub mod settings;
