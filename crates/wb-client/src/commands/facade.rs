//! High-level commands against the attached application
//!
//! Every call goes through the context's current dispatcher. Without one
//! the call fails with [`CommandError::NotConnected`] before anything is
//! written. A response with `success: false` becomes
//! [`CommandError::Remote`] carrying the application's message.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use wb_core::{CommandError, IpcEvent};
use wb_protocol::message::{
    CAPTURE_NATIVE_SCREENSHOT, CLEAR_SCRIPTS, EXECUTE_JS, GET_SCRIPTS, INVOKE_TAURI, LIST_WINDOWS,
    REGISTER_SCRIPT, REMOVE_SCRIPT,
};
use wb_protocol::{plugin_invocation, BroadcastEvent, Response};

use super::types::{ScreenshotOptions, ScriptEntry, WindowScoped};
use crate::dispatch::Dispatcher;
use crate::session::{BridgeContext, ResetHook};

/// Commands exposed to callers of the bridge
pub struct BridgeCommands {
    ctx: Arc<BridgeContext>,
    /// IPC monitoring was started through this session
    monitoring: AtomicBool,
    /// Window context reported by the most recent window-targeted command
    last_window: Mutex<Option<Value>>,
}

impl BridgeCommands {
    /// Create the façade and register its session-scoped state with `ctx`
    pub fn new(ctx: Arc<BridgeContext>) -> Arc<Self> {
        let commands = Arc::new(Self {
            ctx: Arc::clone(&ctx),
            monitoring: AtomicBool::new(false),
            last_window: Mutex::new(None),
        });
        ctx.register_hook(&commands);
        commands
    }

    /// Invoke an arbitrary Tauri command
    pub async fn execute_command(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> Result<Value, CommandError> {
        let args = json!({
            "command": command,
            "args": args.unwrap_or_else(|| json!({})),
        });
        self.call(INVOKE_TAURI, Some(args)).await.map(|r| r.data_value())
    }

    /// Geometry and state of a window
    pub async fn get_window_info(&self, window_label: Option<&str>) -> Result<Value, CommandError> {
        let args = window_label.map(|label| json!({ "windowLabel": label }));
        self.invoke_plugin("get_window_info", args).await
    }

    /// Application metadata, environment and window list
    pub async fn get_backend_state(&self) -> Result<Value, CommandError> {
        self.invoke_plugin("get_backend_state", None).await
    }

    /// Emit an application event
    pub async fn emit_event(&self, event_name: &str, payload: Value) -> Result<Value, CommandError> {
        let args = json!({ "eventName": event_name, "payload": payload });
        self.invoke_plugin("emit_event", Some(args)).await
    }

    /// Start capturing IPC traffic inside the application
    pub async fn start_ipc_monitor(&self) -> Result<Value, CommandError> {
        let data = self.invoke_plugin("start_ipc_monitor", None).await?;
        self.monitoring.store(true, Ordering::SeqCst);
        Ok(data)
    }

    /// Stop capturing IPC traffic
    pub async fn stop_ipc_monitor(&self) -> Result<Value, CommandError> {
        let data = self.invoke_plugin("stop_ipc_monitor", None).await?;
        self.monitoring.store(false, Ordering::SeqCst);
        Ok(data)
    }

    /// IPC calls captured since monitoring started
    pub async fn get_ipc_events(&self) -> Result<Vec<IpcEvent>, CommandError> {
        let data = self.invoke_plugin("get_ipc_events", None).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(data).map_err(|source| CommandError::Decode {
            command: "get_ipc_events".to_string(),
            source,
        })
    }

    /// All webview windows
    pub async fn list_windows(&self) -> Result<Value, CommandError> {
        self.call(LIST_WINDOWS, None).await.map(|r| r.data_value())
    }

    /// Evaluate JavaScript in a window
    pub async fn execute_js(
        &self,
        script: &str,
        window_label: Option<&str>,
    ) -> Result<WindowScoped, CommandError> {
        let mut args = json!({ "script": script });
        set_window_label(&mut args, window_label);
        self.call_scoped(EXECUTE_JS, args).await
    }

    /// Capture a window as an image data URL
    pub async fn capture_screenshot(
        &self,
        options: &ScreenshotOptions,
    ) -> Result<WindowScoped, CommandError> {
        let args = serde_json::to_value(options).map_err(|source| CommandError::Decode {
            command: CAPTURE_NATIVE_SCREENSHOT.to_string(),
            source,
        })?;
        self.call_scoped(CAPTURE_NATIVE_SCREENSHOT, args).await
    }

    /// Register a script re-injected on every page load
    pub async fn register_script(
        &self,
        entry: &ScriptEntry,
        window_label: Option<&str>,
    ) -> Result<WindowScoped, CommandError> {
        let mut args = json!({
            "id": entry.id,
            "type": entry.kind,
            "content": entry.content,
        });
        set_window_label(&mut args, window_label);
        self.call_scoped(REGISTER_SCRIPT, args).await
    }

    /// Remove a registered script
    pub async fn remove_script(
        &self,
        id: &str,
        window_label: Option<&str>,
    ) -> Result<WindowScoped, CommandError> {
        let mut args = json!({ "id": id });
        set_window_label(&mut args, window_label);
        self.call_scoped(REMOVE_SCRIPT, args).await
    }

    /// Remove every registered script
    pub async fn clear_scripts(
        &self,
        window_label: Option<&str>,
    ) -> Result<WindowScoped, CommandError> {
        let mut args = json!({});
        set_window_label(&mut args, window_label);
        self.call_scoped(CLEAR_SCRIPTS, args).await
    }

    /// Registered scripts
    pub async fn get_scripts(&self) -> Result<Vec<ScriptEntry>, CommandError> {
        let data = self.call(GET_SCRIPTS, None).await?.data_value();
        let scripts = data.get("scripts").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(scripts).map_err(|source| CommandError::Decode {
            command: GET_SCRIPTS.to_string(),
            source,
        })
    }

    /// Frames pushed by the application outside any request
    pub fn subscribe(&self) -> Result<broadcast::Receiver<BroadcastEvent>, CommandError> {
        Ok(self.client()?.subscribe())
    }

    /// No session, or its channel closed and gave up reconnecting
    pub fn connection_lost(&self) -> bool {
        self.ctx
            .client()
            .map(|client| client.reconnect_exhausted())
            .unwrap_or(true)
    }

    /// Whether IPC monitoring was started in the current session
    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// Window context reported by the latest window-targeted command
    pub fn last_window_context(&self) -> Option<Value> {
        self.last_window.lock().clone()
    }

    fn client(&self) -> Result<Arc<Dispatcher>, CommandError> {
        self.ctx.client().ok_or(CommandError::NotConnected)
    }

    async fn invoke_plugin(&self, name: &str, args: Option<Value>) -> Result<Value, CommandError> {
        let envelope = plugin_invocation(name, args);
        self.call(INVOKE_TAURI, Some(envelope))
            .await
            .map(|r| r.data_value())
    }

    async fn call_scoped(&self, command: &str, args: Value) -> Result<WindowScoped, CommandError> {
        let response = self.call(command, Some(args)).await?;
        if let Some(context) = &response.window_context {
            *self.last_window.lock() = Some(context.clone());
        }
        Ok(WindowScoped {
            data: response.data_value(),
            window_context: response.window_context,
        })
    }

    async fn call(&self, command: &str, args: Option<Value>) -> Result<Response, CommandError> {
        let client = self.client()?;
        let response = client.send_command(command, args).await?;
        if response.success {
            Ok(response)
        } else {
            Err(CommandError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

impl ResetHook for BridgeCommands {
    fn reset(&self) {
        self.monitoring.store(false, Ordering::SeqCst);
        *self.last_window.lock() = None;
    }
}

fn set_window_label(args: &mut Value, window_label: Option<&str>) {
    if let (Some(label), Some(map)) = (window_label, args.as_object_mut()) {
        map.insert("windowLabel".to_string(), Value::String(label.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::BridgeConfig;

    #[tokio::test]
    async fn test_commands_require_a_session() {
        let commands = BridgeCommands::new(BridgeContext::new(BridgeConfig::default()));

        let err = commands.get_window_info(None).await.unwrap_err();
        assert!(matches!(err, CommandError::NotConnected));
        assert!(matches!(
            commands.list_windows().await,
            Err(CommandError::NotConnected)
        ));
        assert!(commands.subscribe().is_err());
        assert!(commands.connection_lost());
    }

    #[tokio::test]
    async fn test_teardown_clears_session_state() {
        let ctx = BridgeContext::new(BridgeConfig::default());
        let commands = BridgeCommands::new(Arc::clone(&ctx));
        commands.monitoring.store(true, Ordering::SeqCst);
        *commands.last_window.lock() = Some(json!({"windowLabel": "main"}));

        ctx.teardown();
        assert!(!commands.is_monitoring());
        assert!(commands.last_window_context().is_none());
    }

    #[test]
    fn test_set_window_label() {
        let mut args = json!({"script": "1"});
        set_window_label(&mut args, Some("settings"));
        assert_eq!(args["windowLabel"], "settings");

        let mut args = json!({"script": "1"});
        set_window_label(&mut args, None);
        assert!(args.get("windowLabel").is_none());
    }
}
