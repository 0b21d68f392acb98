//! wb-core: Core abstractions and configuration for the webview bridge
//!
//! This crate provides the shared types, configuration structures and error
//! taxonomy used by the client library and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::BridgeConfig;
pub use error::{CommandError, ConfigError, DispatchError, ResolutionError, TransportError};
pub use types::{
    ConnectionState, CoordinatorState, Endpoint, IpcEvent, Session, SessionStatus, LOOPBACK_HOST,
};
