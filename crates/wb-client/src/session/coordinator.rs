//! Session lifecycle: choosing an instance, attaching, tearing down
//!
//! `start` runs a fixed strategy and stops at the first endpoint that
//! accepts a connection:
//!
//! 1. Discard any current dispatcher.
//! 2. Take host and port from the arguments, falling back to configuration.
//! 3. If the host is not loopback, try `localhost` on the same port first.
//! 4. Try the configured host and port.
//! 5. If the port was not given explicitly, scan the discovery range on
//!    `localhost` and try the lowest live port.
//! 6. If the port was explicit, stop with a diagnostic that says discovery
//!    was skipped.
//! 7. Otherwise try the configured endpoint one last time, then give up.
//!
//! Failing to find an instance is not an error. `start` always returns a
//! [`StartReport`]; when nothing attached the report is in the `Failed`
//! state and carries the reason.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;

use wb_core::{
    CoordinatorState, Endpoint, ResolutionError, Session, SessionStatus, LOOPBACK_HOST,
};
use wb_protocol::message::INVOKE_TAURI;
use wb_protocol::plugin_invocation;

use super::context::BridgeContext;
use crate::discovery::{EndpointResolver, SessionRegistry};
use crate::dispatch::{Dispatcher, DispatcherOptions};

/// Outcome of [`SessionCoordinator::start`]
#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    /// State after the attempt
    pub state: CoordinatorState,
    /// Attached session, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Human-readable summary
    pub message: String,
    /// Why nothing attached
    #[serde(skip)]
    pub failure: Option<ResolutionError>,
}

impl StartReport {
    /// Whether a session is attached
    pub fn is_attached(&self) -> bool {
        self.state == CoordinatorState::Attached
    }
}

/// Owns the session lifecycle for one [`BridgeContext`]
pub struct SessionCoordinator {
    ctx: Arc<BridgeContext>,
    resolver: EndpointResolver,
    registry: SessionRegistry,
    state: Mutex<CoordinatorState>,
    current: RwLock<Option<Session>>,
    /// Serializes start and stop
    lifecycle: tokio::sync::Mutex<()>,
}

impl SessionCoordinator {
    /// Create a coordinator using the context's configuration
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        let resolver = EndpointResolver::from_config(ctx.config());
        Self::with_resolver(ctx, resolver)
    }

    /// Create a coordinator with a custom resolver
    pub fn with_resolver(ctx: Arc<BridgeContext>, resolver: EndpointResolver) -> Self {
        Self {
            ctx,
            resolver,
            registry: SessionRegistry::new(),
            state: Mutex::new(CoordinatorState::Idle),
            current: RwLock::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Shared context
    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    /// Current state
    pub fn state(&self) -> CoordinatorState {
        *self.state.lock()
    }

    /// Attached session, if any
    pub fn current_session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Every session opened since the last stop
    pub fn sessions(&self) -> Vec<Session> {
        self.registry.list()
    }

    /// Attach to an application instance
    ///
    /// `host` and `port` override configuration. A port passed here, set in
    /// the config file, or set through `MCP_BRIDGE_PORT` is explicit and
    /// disables discovery.
    pub async fn start(&self, host: Option<&str>, port: Option<u16>) -> StartReport {
        let _lifecycle = self.lifecycle.lock().await;

        self.ctx.reset();
        *self.current.write() = None;
        self.set_state(CoordinatorState::Connecting);

        let config = self.ctx.config();
        let configured = Endpoint::new(
            host.unwrap_or_else(|| config.resolved_host()),
            port.unwrap_or_else(|| config.resolved_port()),
        );
        let port_is_explicit = port.is_some() || config.port_is_explicit();
        tracing::debug!(
            "Starting session for {} (port explicit: {})",
            configured,
            port_is_explicit
        );

        if !configured.is_loopback() {
            let loopback = Endpoint::loopback(configured.port());
            if let Some(session) = self.try_attach(loopback).await {
                return self.attached(session);
            }
        }

        if let Some(session) = self.try_attach(configured.clone()).await {
            return self.attached(session);
        }

        if port_is_explicit {
            return self.failed(ResolutionError::DiscoverySkipped {
                host: configured.host().to_string(),
                port: configured.port(),
            });
        }

        if let Some(found) = self.resolver.first_available(LOOPBACK_HOST).await {
            tracing::info!("Discovered bridge at {}", found);
            if let Some(session) = self.try_attach(found).await {
                return self.attached(session);
            }
        }

        if let Some(session) = self.try_attach(configured.clone()).await {
            return self.attached(session);
        }

        self.failed(ResolutionError::NoInstanceFound {
            host: configured.host().to_string(),
            port: configured.port(),
        })
    }

    /// Close every session and clear session-scoped state
    ///
    /// Safe to call when nothing is attached.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        let closed = self.registry.disconnect_all();
        self.ctx.teardown();
        *self.current.write() = None;
        self.set_state(CoordinatorState::Idle);
        tracing::info!("Session stopped ({} connection(s) closed)", closed);
    }

    /// Connection status of the current session
    pub fn status(&self) -> SessionStatus {
        let connected = self
            .ctx
            .client()
            .map(|client| client.is_connected())
            .unwrap_or(false);

        match self.current.read().as_ref() {
            Some(session) if connected => SessionStatus::attached(session),
            _ => SessionStatus::disconnected(),
        }
    }

    async fn try_attach(&self, endpoint: Endpoint) -> Option<Session> {
        let dispatcher = Arc::new(Dispatcher::new(
            endpoint.clone(),
            DispatcherOptions::from(self.ctx.config()),
        ));

        if let Err(e) = dispatcher.connect().await {
            tracing::debug!("No bridge at {}: {}", endpoint, e);
            return None;
        }

        let session = self.identify(&dispatcher, endpoint).await;
        self.registry.insert(session.clone(), Arc::clone(&dispatcher));
        self.ctx.install(dispatcher);
        Some(session)
    }

    /// Ask the application who it is, falling back to an anonymous session
    async fn identify(&self, dispatcher: &Dispatcher, endpoint: Endpoint) -> Session {
        let args = plugin_invocation("get_backend_state", None);
        let reply = dispatcher
            .send_command_with_timeout(
                INVOKE_TAURI,
                Some(args),
                self.ctx.config().identity_timeout,
            )
            .await;

        match reply {
            Ok(response) if response.success => {
                let data = response.data_value();
                match app_identity(&data) {
                    Some((app_id, display_name)) => Session {
                        app_id,
                        display_name,
                        endpoint,
                        connected: true,
                    },
                    None => Session::anonymous(endpoint),
                }
            }
            Ok(response) => {
                tracing::debug!(
                    "Identity query failed at {}: {}",
                    endpoint,
                    response.error.as_deref().unwrap_or("unknown error")
                );
                Session::anonymous(endpoint)
            }
            Err(e) => {
                tracing::debug!("Identity query failed at {}: {}", endpoint, e);
                Session::anonymous(endpoint)
            }
        }
    }

    fn attached(&self, session: Session) -> StartReport {
        tracing::info!(
            "Attached to {} at {}",
            session.display_name,
            session.endpoint
        );
        *self.current.write() = Some(session.clone());
        self.set_state(CoordinatorState::Attached);
        StartReport {
            state: CoordinatorState::Attached,
            message: format!(
                "Session started with app '{}' at {}",
                session.display_name, session.endpoint
            ),
            session: Some(session),
            failure: None,
        }
    }

    fn failed(&self, failure: ResolutionError) -> StartReport {
        tracing::warn!("{}", failure);
        self.set_state(CoordinatorState::Failed);
        let message = match &failure {
            ResolutionError::DiscoverySkipped { .. } => failure.to_string(),
            ResolutionError::NoInstanceFound { .. } => {
                format!("Session started without an app connection. {}", failure)
            }
        };
        StartReport {
            state: CoordinatorState::Failed,
            session: None,
            message,
            failure: Some(failure),
        }
    }

    fn set_state(&self, state: CoordinatorState) {
        let mut current = self.state.lock();
        if *current != state {
            tracing::trace!("Coordinator {} -> {}", *current, state);
            *current = state;
        }
    }
}

/// `(identifier, name)` from a `get_backend_state` result
fn app_identity(data: &Value) -> Option<(String, String)> {
    let app = data.get("app")?;
    let identifier = app.get("identifier").and_then(Value::as_str)?;
    let name = app
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(identifier);
    Some((identifier.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wb_core::BridgeConfig;

    #[test]
    fn test_app_identity() {
        let data = json!({"app": {"name": "Example", "identifier": "com.example.app"}});
        assert_eq!(
            app_identity(&data),
            Some(("com.example.app".to_string(), "Example".to_string()))
        );

        let unnamed = json!({"app": {"identifier": "com.example.app"}});
        assert_eq!(app_identity(&unnamed).unwrap().1, "com.example.app");

        assert_eq!(app_identity(&json!({"windows": []})), None);
    }

    #[tokio::test]
    async fn test_status_before_start() {
        let coordinator = SessionCoordinator::new(BridgeContext::new(BridgeConfig::default()));
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.status(), SessionStatus::disconnected());
        assert!(coordinator.current_session().is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let coordinator = SessionCoordinator::new(BridgeContext::new(BridgeConfig::default()));
        coordinator.stop().await;
        coordinator.stop().await;
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(coordinator.sessions().is_empty());
    }
}
