//! Message types for the bridge protocol
//!
//! Every frame is a JSON object. Requests carry a client-generated `id`
//! which the application echoes back in the matching response, so any
//! number of requests can be in flight on one connection and answered in
//! any order.
//!
//! # Message Flow
//!
//! 1. Client sends `{id, command, args?}`
//! 2. Application replies `{id, success, data?, error?}`
//! 3. At any time the application may push frames without a known `id`
//!    (broadcast events), conventionally `{type, payload, timestamp}`

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level command that wraps a Tauri plugin command invocation.
pub const INVOKE_TAURI: &str = "invoke_tauri";
/// List all webview windows.
pub const LIST_WINDOWS: &str = "list_windows";
/// Evaluate a script in a webview.
pub const EXECUTE_JS: &str = "execute_js";
/// Capture a native screenshot of a window.
pub const CAPTURE_NATIVE_SCREENSHOT: &str = "capture_native_screenshot";
/// Register a script that is re-injected on every page load.
pub const REGISTER_SCRIPT: &str = "register_script";
/// Remove a registered script.
pub const REMOVE_SCRIPT: &str = "remove_script";
/// Remove every registered script.
pub const CLEAR_SCRIPTS: &str = "clear_scripts";
/// List registered scripts.
pub const GET_SCRIPTS: &str = "get_scripts";

/// Prefix for commands routed to the bridge plugin through `invoke_tauri`.
pub const PLUGIN_COMMAND_PREFIX: &str = "plugin:mcp-bridge|";

/// Arguments for an `invoke_tauri` frame targeting a bridge plugin command
///
/// `plugin_invocation("get_window_info", None)` yields
/// `{"command": "plugin:mcp-bridge|get_window_info", "args": {}}`.
pub fn plugin_invocation(name: &str, args: Option<Value>) -> Value {
    serde_json::json!({
        "command": format!("{}{}", PLUGIN_COMMAND_PREFIX, name),
        "args": args.unwrap_or_else(|| Value::Object(Default::default())),
    })
}

/// Length of the random suffix appended to request ids
const REQUEST_ID_SUFFIX_LEN: usize = 9;

const REQUEST_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier correlating a request with its response
///
/// Millisecond timestamp plus a random base-36 suffix. Uniqueness only has
/// to hold among requests currently in flight on one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh request id
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        let suffix: String = (0..REQUEST_ID_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..REQUEST_ID_ALPHABET.len());
                REQUEST_ID_ALPHABET[idx] as char
            })
            .collect();

        Self(format!("{}-{}", millis, suffix))
    }

    /// Get the raw id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outbound command frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id
    pub id: RequestId,
    /// Command name
    pub command: String,
    /// Command arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Request {
    /// Create a request with a freshly generated id
    pub fn new(command: impl Into<String>, args: Option<Value>) -> Self {
        Self::with_id(RequestId::generate(), command, args)
    }

    /// Create a request with a caller-chosen id
    pub fn with_id(id: RequestId, command: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            id,
            command: command.into(),
            args,
        }
    }
}

/// Inbound reply to a [`Request`]
///
/// `success` and `error` describe the outcome of the command on the
/// application side. The client passes them through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Correlation id echoed from the request
    pub id: String,
    /// Whether the command succeeded on the application side
    #[serde(default)]
    pub success: bool,
    /// Command result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure message reported by the application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Window the command resolved to, for window-targeted commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_context: Option<Value>,
}

impl Response {
    /// Build a successful response
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
            window_context: None,
        }
    }

    /// Build a failed response
    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            window_context: None,
        }
    }

    /// Result data, decoding a string payload that itself holds JSON
    ///
    /// Plugin commands invoked through `invoke_tauri` often return their
    /// result serialized as a string. Missing data becomes `null`.
    pub fn data_value(&self) -> Value {
        match &self.data {
            Some(Value::String(text)) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            }
            Some(value) => value.clone(),
            None => Value::Null,
        }
    }

    /// Decode a correlated frame into a response.
    ///
    /// A frame that carries a pending id but does not otherwise fit the
    /// response shape still settles the request, as a failed response.
    pub fn from_frame(id: &str, value: Value) -> Self {
        match serde_json::from_value::<Response>(value) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "Malformed response frame");
                Self::failed(id, format!("Malformed response: {}", e))
            }
        }
    }
}

/// Unsolicited frame pushed by the application
///
/// The conventional shape is `{type, payload, timestamp}` but nothing is
/// enforced; the raw frame is kept and the accessors return `None` for
/// missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastEvent(pub Value);

impl BroadcastEvent {
    /// Event type, if present
    pub fn event_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Event payload, if present
    pub fn payload(&self) -> Option<&Value> {
        self.0.get("payload")
    }

    /// Event timestamp, if present
    pub fn timestamp(&self) -> Option<&str> {
        self.0.get("timestamp").and_then(Value::as_str)
    }

    /// The raw frame
    pub fn raw(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_shape() {
        let id = RequestId::generate();
        let (millis, suffix) = id.as_str().split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert_eq!(suffix.len(), REQUEST_ID_SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_request_ids_differ() {
        let ids: std::collections::HashSet<_> = (0..1000).map(|_| RequestId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_plugin_invocation_envelope() {
        let args = plugin_invocation("emit_event", Some(json!({"eventName": "ready"})));
        assert_eq!(args["command"], "plugin:mcp-bridge|emit_event");
        assert_eq!(args["args"]["eventName"], "ready");
        assert_eq!(plugin_invocation("get_backend_state", None)["args"], json!({}));
    }

    #[test]
    fn test_request_omits_missing_args() {
        let req = Request::with_id("abc".into(), "list_windows", None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({"id": "abc", "command": "list_windows"}));
    }

    #[test]
    fn test_response_window_context() {
        let value = json!({
            "id": "1",
            "success": true,
            "data": 42,
            "windowContext": {"label": "main"}
        });
        let resp: Response = serde_json::from_value(value).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data, Some(json!(42)));
        assert_eq!(resp.window_context, Some(json!({"label": "main"})));
    }

    #[test]
    fn test_data_value_decodes_json_strings() {
        let resp = Response::ok("1", json!("{\"width\":800}"));
        assert_eq!(resp.data_value(), json!({"width": 800}));

        let resp = Response::ok("1", json!("plain text"));
        assert_eq!(resp.data_value(), json!("plain text"));

        let resp = Response::failed("1", "boom");
        assert_eq!(resp.data_value(), Value::Null);
    }

    #[test]
    fn test_response_from_malformed_frame() {
        let resp = Response::from_frame("7", json!({"id": "7", "error": {"nested": true}}));
        assert_eq!(resp.id, "7");
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Malformed response"));
    }

    #[test]
    fn test_broadcast_accessors() {
        let event = BroadcastEvent(json!({
            "type": "ipc",
            "payload": {"command": "greet"},
            "timestamp": "2024-01-01T00:00:00Z"
        }));
        assert_eq!(event.event_type(), Some("ipc"));
        assert_eq!(event.payload(), Some(&json!({"command": "greet"})));
        assert_eq!(event.timestamp(), Some("2024-01-01T00:00:00Z"));

        let bare = BroadcastEvent(json!({"hello": 1}));
        assert_eq!(bare.event_type(), None);
    }
}
