//! Command dispatch: request ids, pending requests and broadcast routing

mod dispatcher;
mod pending;

pub use dispatcher::{Dispatcher, DispatcherOptions};
