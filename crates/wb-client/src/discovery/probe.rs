//! Liveness probes used by discovery

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use wb_core::config::ReconnectConfig;
use wb_core::Endpoint;

use crate::transport::Transport;

/// Decides whether something is listening at an endpoint
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Probe once; any error or an elapsed timeout counts as not live
    async fn is_live(&self, endpoint: &Endpoint, timeout: Duration) -> bool;
}

/// Full WebSocket handshake on a throwaway channel
///
/// A plain TCP listener that is not the bridge plugin fails the upgrade and
/// is reported as not live.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketProbe;

#[async_trait]
impl LivenessProbe for WebSocketProbe {
    async fn is_live(&self, endpoint: &Endpoint, timeout: Duration) -> bool {
        let (transport, _events) =
            Transport::new(endpoint.clone(), &ReconnectConfig::disabled(), None);

        let live = matches!(
            tokio::time::timeout(timeout, transport.connect()).await,
            Ok(Ok(()))
        );
        transport.disconnect();
        tracing::trace!("Probe {} -> {}", endpoint, live);
        live
    }
}

/// TCP connect only
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl LivenessProbe for TcpProbe {
    async fn is_live(&self, endpoint: &Endpoint, timeout: Duration) -> bool {
        let address = (endpoint.host(), endpoint.port());
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(address)).await,
            Ok(Ok(_))
        )
    }
}
