//! Session management

mod context;
mod coordinator;

pub use context::{BridgeContext, ResetHook};
pub use coordinator::{SessionCoordinator, StartReport};
