//! High-level command façade

mod facade;
mod types;

pub use facade::BridgeCommands;
pub use types::{ImageFormat, ScreenshotOptions, ScriptEntry, ScriptKind, WindowScoped};
