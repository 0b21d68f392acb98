//! Transport layer: one reconnecting WebSocket channel per endpoint

mod channel;
mod reconnect;

pub use channel::{ChannelEvent, Transport};
pub use reconnect::LinearBackoff;
