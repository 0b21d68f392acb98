//! Port-range discovery of running application instances

use std::sync::Arc;
use std::time::Duration;

use wb_core::{BridgeConfig, Endpoint};

use super::probe::{LivenessProbe, WebSocketProbe};

/// Finds live bridge endpoints by probing a port range
///
/// Ports are probed one at a time in ascending order, so the first live
/// endpoint reported is always the lowest live port.
#[derive(Clone)]
pub struct EndpointResolver {
    probe: Arc<dyn LivenessProbe>,
    probe_timeout: Duration,
    base_port: u16,
    max_ports: u16,
}

impl EndpointResolver {
    /// Resolver using the WebSocket probe and the configured range
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            probe: Arc::new(WebSocketProbe),
            probe_timeout: config.probe_timeout,
            base_port: config.discovery_base_port,
            max_ports: config.discovery_max_ports,
        }
    }

    /// Replace the liveness probe
    pub fn with_probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Default first port scanned
    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Probe a single endpoint
    pub async fn probe(&self, endpoint: &Endpoint) -> bool {
        self.probe.is_live(endpoint, self.probe_timeout).await
    }

    /// Probe `[base_port, base_port + max_ports)` on `host`
    ///
    /// Ports past 65535 are not scanned.
    pub async fn discover(&self, host: &str, base_port: u16, max_ports: u16) -> Vec<Endpoint> {
        let mut live = Vec::new();
        for port in port_range(base_port, max_ports) {
            let endpoint = Endpoint::new(host, port);
            if self.probe(&endpoint).await {
                tracing::debug!("Found bridge at {}", endpoint);
                live.push(endpoint);
            }
        }
        tracing::debug!(
            "Discovery on {} ports {}+{} found {} instance(s)",
            host,
            base_port,
            max_ports,
            live.len()
        );
        live
    }

    /// Probe the configured range on `host`
    pub async fn discover_default(&self, host: &str) -> Vec<Endpoint> {
        self.discover(host, self.base_port, self.max_ports).await
    }

    /// Lowest live port in the configured range on `host`
    pub async fn first_available(&self, host: &str) -> Option<Endpoint> {
        for port in port_range(self.base_port, self.max_ports) {
            let endpoint = Endpoint::new(host, port);
            if self.probe(&endpoint).await {
                return Some(endpoint);
            }
        }
        None
    }
}

fn port_range(base_port: u16, max_ports: u16) -> impl Iterator<Item = u16> {
    (0..max_ports).map_while(move |offset| base_port.checked_add(offset))
}
