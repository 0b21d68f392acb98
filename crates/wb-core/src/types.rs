//! Core domain types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::IpAddr;

/// Loopback host used when preferring a local connection
pub const LOOPBACK_HOST: &str = "localhost";

/// A candidate application instance
///
/// Equality is purely textual; `localhost` and `127.0.0.1` are different
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Loopback endpoint on the given port
    pub fn loopback(port: u16) -> Self {
        Self::new(LOOPBACK_HOST, port)
    }

    /// Host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Registry key (`{host}_{port}`)
    pub fn key(&self) -> String {
        format!("{}_{}", self.host, self.port)
    }

    /// WebSocket URL for this endpoint
    pub fn ws_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("ws://[{}]:{}", self.host, self.port)
        } else {
            format!("ws://{}:{}", self.host, self.port)
        }
    }

    /// Whether the host refers to the local machine
    pub fn is_loopback(&self) -> bool {
        is_loopback_host(&self.host)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Check whether a host string names the loopback interface
pub fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    trimmed
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Lifecycle of a single transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Ready for traffic
    Open,
    /// Close requested, waiting for the socket to wind down
    Closing,
    /// No socket
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Session coordinator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No session
    Idle,
    /// Running the connection strategy
    Connecting,
    /// Attached to an application instance
    Attached,
    /// Every strategy failed
    Failed,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorState::Idle => write!(f, "idle"),
            CoordinatorState::Connecting => write!(f, "connecting"),
            CoordinatorState::Attached => write!(f, "attached"),
            CoordinatorState::Failed => write!(f, "failed"),
        }
    }
}

/// One logical attachment to an application instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Application identifier (bundle identifier when known)
    pub app_id: String,
    /// Human-readable application name
    pub display_name: String,
    /// Where the application is listening
    pub endpoint: Endpoint,
    /// Whether the session's channel was open when last observed
    pub connected: bool,
}

impl Session {
    /// Session for an endpoint whose identity has not been queried
    pub fn anonymous(endpoint: Endpoint) -> Self {
        let key = endpoint.key();
        Self {
            app_id: key.clone(),
            display_name: key,
            endpoint,
            connected: true,
        }
    }
}

/// Session status as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub app: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

impl SessionStatus {
    /// The "not connected" shape
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            app: None,
            host: None,
            port: None,
        }
    }

    /// Status for an attached session
    pub fn attached(session: &Session) -> Self {
        Self {
            connected: true,
            app: Some(session.display_name.clone()),
            host: Some(session.endpoint.host().to_string()),
            port: Some(session.endpoint.port().to_string()),
        }
    }
}

/// IPC call captured by the application's IPC monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcEvent {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Invoked command
    pub command: String,
    /// Invocation arguments
    #[serde(default)]
    pub args: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: Option<f64>,
}
