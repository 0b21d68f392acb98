//! wb-client: Client side of the webview bridge
//!
//! Connects to the bridge plugin running inside a Tauri application and
//! drives it over a JSON-over-WebSocket command channel.
//!
//! # Layers
//!
//! - [`transport`]: one reconnecting WebSocket channel per endpoint
//! - [`dispatch`]: request ids, timeouts, response correlation, broadcasts
//! - [`discovery`]: port-range probing and the session registry
//! - [`session`]: the shared [`BridgeContext`] and the [`SessionCoordinator`]
//! - [`commands`]: typed high-level commands
//!
//! # Example
//!
//! ```ignore
//! let ctx = BridgeContext::new(BridgeConfig::default());
//! let coordinator = SessionCoordinator::new(Arc::clone(&ctx));
//! let commands = BridgeCommands::new(Arc::clone(&ctx));
//!
//! let report = coordinator.start(None, None).await;
//! if report.is_attached() {
//!     let info = commands.get_window_info(None).await?;
//! }
//! coordinator.stop().await;
//! ```

pub mod commands;
pub mod discovery;
pub mod dispatch;
pub mod session;
pub mod transport;

pub use commands::BridgeCommands;
pub use discovery::{EndpointResolver, SessionRegistry};
pub use dispatch::{Dispatcher, DispatcherOptions};
pub use session::{BridgeContext, ResetHook, SessionCoordinator, StartReport};
