//! Core error types for the webview bridge

use std::path::PathBuf;
use thiserror::Error;
use wb_protocol::ProtocolError;

use crate::types::Endpoint;

/// Errors raised by the transport channel
#[derive(Error, Debug)]
pub enum TransportError {
    /// The connection attempt failed before the socket opened
    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: Endpoint, reason: String },

    /// The connection attempt did not complete in time
    #[error("Connection to {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout { endpoint: Endpoint, timeout_ms: u64 },

    /// Write attempted while the socket is not open
    #[error("WebSocket is not open")]
    NotOpen,
}

/// Errors raised while sending a command and awaiting its response
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No open channel
    #[error("Not connected to a Tauri app")]
    NotConnected,

    /// No response arrived in time
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The channel closed while the request was outstanding
    #[error("Connection closed before a response to request {id} arrived")]
    ConnectionClosed { id: String },

    /// The write itself failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// No application instance could be attached
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Port was configured explicitly, so discovery did not run
    #[error(
        "No Tauri app found at {host}:{port}. The port was explicitly configured, \
         so auto-discovery was skipped. Make sure the app is running with the \
         MCP bridge plugin listening on that port."
    )]
    DiscoverySkipped { host: String, port: u16 },

    /// Nothing answered on any strategy
    #[error(
        "No Tauri app found at {host}:{port} or on any discovered port. \
         Make sure the app is running with the MCP bridge plugin enabled."
    )]
    NoInstanceFound { host: String, port: u16 },
}

/// Errors surfaced by high-level commands
#[derive(Error, Debug)]
pub enum CommandError {
    /// No session is attached
    #[error("Not connected to a Tauri app. Start a session first.")]
    NotConnected,

    /// Transport-level failure
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The application reported a failure
    #[error("{0}")]
    Remote(String),

    /// The command succeeded but its data had an unexpected shape
    #[error("Unexpected result for {command}: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Port value that does not fit a TCP port
    #[error("Invalid port {value:?} in {source_name}")]
    InvalidPort { source_name: String, value: String },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = DispatchError::Timeout { timeout_ms: 250 };
        assert_eq!(err.to_string(), "Request timeout after 250ms");
    }

    #[test]
    fn test_resolution_messages_differ() {
        let skipped = ResolutionError::DiscoverySkipped {
            host: "10.0.0.5".to_string(),
            port: 9300,
        };
        let none = ResolutionError::NoInstanceFound {
            host: "localhost".to_string(),
            port: 9223,
        };
        assert!(skipped.to_string().contains("10.0.0.5:9300"));
        assert!(skipped.to_string().contains("auto-discovery was skipped"));
        assert!(!none.to_string().contains("skipped"));
    }
}
