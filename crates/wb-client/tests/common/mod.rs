//! In-process stand-in for the bridge plugin

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Base port for test servers - each test gets a unique block
static PORT_COUNTER: AtomicU16 = AtomicU16::new(0);

/// Ports reserved per call, so discovery tests can use a small range
pub const PORT_BLOCK: u16 = 16;

/// Get the first port of a block no other test in this binary uses
pub fn get_test_port() -> u16 {
    let block = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    39000 + block * PORT_BLOCK
}

/// What the mock does with one request
pub enum Reply {
    /// `{id, success: true, data}`
    Ok(Value),
    /// `{id, success: false, error}`
    Err(String),
    /// A frame sent as-is
    Raw(Value),
    /// A text frame sent as-is, JSON or not
    Text(String),
    /// Several replies in order
    Many(Vec<Reply>),
    /// Another reply after a delay
    After(Duration, Box<Reply>),
    /// Never answer
    Ignore,
    /// Close the connection
    Close,
}

pub type Handler = Arc<dyn Fn(&Value) -> Reply + Send + Sync>;

/// Inner name of an `invoke_tauri` plugin command
pub fn plugin_command(request: &Value) -> Option<&str> {
    if request["command"] != "invoke_tauri" {
        return None;
    }
    request["args"]["command"]
        .as_str()
        .and_then(|c| c.strip_prefix("plugin:mcp-bridge|"))
}

/// Handler that behaves like a small Tauri app called "Mock App"
pub fn app_handler() -> Handler {
    Arc::new(|request: &Value| {
        if let Some(name) = plugin_command(request) {
            return match name {
                "get_backend_state" => Reply::Ok(json!({
                    "app": {"name": "Mock App", "identifier": "com.example.mock", "version": "1.0.0"},
                    "windows": [{"label": "main"}]
                })),
                "get_window_info" => {
                    let label = request["args"]["args"]["windowLabel"]
                        .as_str()
                        .unwrap_or("main");
                    Reply::Ok(json!({"width": 800, "height": 600, "label": label}))
                }
                "get_ipc_events" => Reply::Ok(Value::String(
                    json!([{
                        "timestamp": 1700000000000u64,
                        "command": "greet",
                        "args": {"name": "bridge"},
                        "result": "Hello, bridge!",
                        "error": null,
                        "duration_ms": 0.4
                    }])
                    .to_string(),
                )),
                "emit_event" => Reply::Ok(json!("Event emitted")),
                "start_ipc_monitor" | "stop_ipc_monitor" => Reply::Ok(json!({"ok": true})),
                other => Reply::Err(format!("Unknown plugin command: {}", other)),
            };
        }

        match request["command"].as_str() {
            Some("execute_js") => Reply::Raw(json!({
                "id": request["id"],
                "success": true,
                "data": 2,
                "windowContext": {"windowLabel": "main", "totalWindows": 1, "warning": null}
            })),
            Some("list_windows") => Reply::Ok(json!([{"label": "main", "title": "Mock"}])),
            Some("get_scripts") => Reply::Ok(json!({"scripts": [
                {"id": "probe", "type": "inline", "content": "window.__probe = 1"}
            ]})),
            Some("fail") => Reply::Err("Window not found: ghost".to_string()),
            Some("hang") => Reply::Ignore,
            Some("close") => Reply::Close,
            Some(_) => Reply::Ok(request["args"].clone()),
            None => Reply::Ignore,
        }
    })
}

/// A running mock bridge
pub struct MockBridge {
    pub port: u16,
    accepts: Arc<AtomicUsize>,
    pushes: broadcast::Sender<Value>,
    task: JoinHandle<()>,
}

impl MockBridge {
    /// Listen on `127.0.0.1:port`
    pub async fn start(port: u16, handler: Handler) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("Failed to bind mock bridge");
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));
        let (pushes, _) = broadcast::channel(64);

        let task = {
            let accepts = Arc::clone(&accepts);
            let pushes = pushes.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    accepts.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream, Arc::clone(&handler), pushes.subscribe()));
                }
            })
        };

        Self {
            port,
            accepts,
            pushes,
            task,
        }
    }

    /// TCP connections accepted so far
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Push a frame to every connected client
    pub fn push(&self, frame: Value) {
        let _ = self.pushes.send(frame);
    }
}

impl Drop for MockBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, handler: Handler, mut pushes: broadcast::Receiver<Value>) {
    let Ok(socket) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Option<Message>>();

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let reply = handler(&request);
                    schedule(reply, request["id"].clone(), out_tx.clone());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            Some(outgoing) = out_rx.recv() => match outgoing {
                Some(message) => {
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            push = pushes.recv() => match push {
                Ok(frame) => {
                    if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn schedule(reply: Reply, id: Value, out: mpsc::UnboundedSender<Option<Message>>) {
    let text = |value: Value| Some(Message::Text(value.to_string().into()));
    match reply {
        Reply::Ok(data) => {
            let _ = out.send(text(json!({"id": id, "success": true, "data": data})));
        }
        Reply::Err(error) => {
            let _ = out.send(text(json!({"id": id, "success": false, "error": error})));
        }
        Reply::Raw(frame) => {
            let _ = out.send(text(frame));
        }
        Reply::Text(raw) => {
            let _ = out.send(Some(Message::Text(raw.into())));
        }
        Reply::Many(replies) => {
            for reply in replies {
                schedule(reply, id.clone(), out.clone());
            }
        }
        Reply::After(delay, inner) => {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                schedule(*inner, id, out);
            });
        }
        Reply::Ignore => {}
        Reply::Close => {
            let _ = out.send(None);
        }
    }
}
