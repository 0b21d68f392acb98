//! Session lifecycle for one CLI invocation, plus `status` and `discover`

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use wb_client::{BridgeCommands, BridgeContext, EndpointResolver, SessionCoordinator, StartReport};
use wb_core::BridgeConfig;

use crate::output::{format_endpoints, print_json};

/// A started coordinator and the command façade bound to it
pub struct BridgeSession {
    coordinator: SessionCoordinator,
    commands: Arc<BridgeCommands>,
    report: StartReport,
}

impl BridgeSession {
    /// Run the start strategy against `config`
    ///
    /// Never fails; whether an application was found is in [`Self::report`].
    pub async fn open(config: BridgeConfig) -> Self {
        let ctx = BridgeContext::new(config);
        let coordinator = SessionCoordinator::new(Arc::clone(&ctx));
        let commands = BridgeCommands::new(ctx);

        let report = coordinator.start(None, None).await;
        if report.is_attached() {
            tracing::info!("{}", report.message);
        } else {
            tracing::warn!("{}", report.message);
        }

        Self {
            coordinator,
            commands,
            report,
        }
    }

    pub fn report(&self) -> &StartReport {
        &self.report
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// The façade, or the start message as an error when nothing attached
    pub fn attached(&self) -> Result<&BridgeCommands> {
        if !self.report.is_attached() {
            anyhow::bail!("{}", self.report.message);
        }
        Ok(&self.commands)
    }

    /// Stop the session and close every connection
    pub async fn close(self) {
        self.coordinator.stop().await;
    }
}

/// Execute the status command
pub async fn status_command(session: &BridgeSession) -> Result<()> {
    let report = session.report();
    print_json(&json!({
        "state": report.state,
        "message": report.message,
        "status": session.coordinator().status(),
        "session": report.session,
    }))
}

/// Execute the discover command
///
/// Scans the configured port range on the configured host without attaching.
pub async fn discover_command(config: &BridgeConfig, table: bool) -> Result<()> {
    let resolver = EndpointResolver::from_config(config);
    let host = config.resolved_host();
    tracing::debug!(
        host,
        base = config.discovery_base_port,
        count = config.discovery_max_ports,
        "Scanning for bridge instances"
    );

    let endpoints = resolver.discover_default(host).await;

    if table {
        println!("{}", format_endpoints(&endpoints));
        Ok(())
    } else {
        print_json(&endpoints)
    }
}
