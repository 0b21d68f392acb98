//! Shared handle to the current dispatcher

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use wb_core::BridgeConfig;

use crate::dispatch::Dispatcher;

/// State owned by a collaborator that must not outlive a session
pub trait ResetHook: Send + Sync {
    /// Forget session-scoped state
    fn reset(&self);
}

/// Context shared by the coordinator and the command façade
///
/// Holds the configuration and at most one current dispatcher. Components
/// receive an `Arc<BridgeContext>` instead of reaching for process-wide
/// state.
pub struct BridgeContext {
    config: BridgeConfig,
    client: RwLock<Option<Arc<Dispatcher>>>,
    hooks: RwLock<Vec<Weak<dyn ResetHook>>>,
}

impl BridgeContext {
    /// Create a context with no dispatcher
    pub fn new(config: BridgeConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            client: RwLock::new(None),
            hooks: RwLock::new(Vec::new()),
        })
    }

    /// Effective configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The current dispatcher, if a session installed one
    pub fn client(&self) -> Option<Arc<Dispatcher>> {
        self.client.read().clone()
    }

    /// Make `dispatcher` current, closing the one it replaces
    pub(crate) fn install(&self, dispatcher: Arc<Dispatcher>) {
        let previous = self.client.write().replace(dispatcher);
        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    /// Close and discard the current dispatcher
    pub fn reset(&self) {
        let previous = self.client.write().take();
        if let Some(previous) = previous {
            tracing::debug!("Discarding dispatcher for {}", previous.endpoint());
            previous.disconnect();
        }
    }

    /// Register state to clear on teardown
    ///
    /// Only a weak reference is kept; dropped hooks are skipped.
    pub fn register_hook<H: ResetHook + 'static>(&self, hook: &Arc<H>) {
        let weak: Weak<H> = Arc::downgrade(hook);
        let weak: Weak<dyn ResetHook> = weak;
        self.hooks.write().push(weak);
    }

    /// Discard the dispatcher and clear every registered collaborator
    pub fn teardown(&self) {
        self.reset();
        let hooks: Vec<Arc<dyn ResetHook>> = {
            let mut registered = self.hooks.write();
            registered.retain(|hook| hook.strong_count() > 0);
            registered.iter().filter_map(Weak::upgrade).collect()
        };
        for hook in hooks {
            hook.reset();
        }
    }
}
