//! Argument and result types for high-level commands

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a registered script's content is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    /// Content is JavaScript source
    Inline,
    /// Content is a URL loaded as a `<script src>`
    Url,
}

impl std::str::FromStr for ScriptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(ScriptKind::Inline),
            "url" => Ok(ScriptKind::Url),
            other => Err(format!("unknown script type '{}' (expected inline or url)", other)),
        }
    }
}

/// A script injected into every page load of a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Caller-chosen id
    pub id: String,
    /// Content kind
    #[serde(rename = "type")]
    pub kind: ScriptKind,
    /// Source or URL
    pub content: String,
}

/// Screenshot image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(format!("unknown image format '{}' (expected png or jpeg)", other)),
        }
    }
}

/// Options for a native screenshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOptions {
    /// Image encoding
    pub format: ImageFormat,
    /// JPEG quality, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Target window (the application picks its main window when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_label: Option<String>,
}

/// Result of a window-targeted command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowScoped {
    /// Command result
    pub data: Value,
    /// Window the application resolved the command to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_context: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_entry_wire_shape() {
        let entry: ScriptEntry = serde_json::from_value(json!({
            "id": "probe",
            "type": "url",
            "content": "https://example.com/probe.js"
        }))
        .unwrap();
        assert_eq!(entry.kind, ScriptKind::Url);
        assert_eq!(serde_json::to_value(&entry).unwrap()["type"], "url");
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("Inline".parse::<ScriptKind>().unwrap(), ScriptKind::Inline);
        assert!("module".parse::<ScriptKind>().is_err());
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_screenshot_options_shape() {
        let opts = ScreenshotOptions {
            format: ImageFormat::Jpeg,
            quality: Some(80),
            window_label: Some("main".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({"format": "jpeg", "quality": 80, "windowLabel": "main"})
        );
        assert_eq!(
            serde_json::to_value(ScreenshotOptions::default()).unwrap(),
            json!({"format": "png"})
        );
    }
}
