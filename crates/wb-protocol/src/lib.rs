//! wb-protocol: Wire protocol for the webview bridge
//!
//! This crate defines the JSON messages exchanged between the bridge client
//! and the bridge plugin running inside the application, carried as text
//! frames over a WebSocket.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{correlation_id, decode_frame, encode_request};
pub use error::ProtocolError;
pub use message::{plugin_invocation, BroadcastEvent, Request, RequestId, Response};
