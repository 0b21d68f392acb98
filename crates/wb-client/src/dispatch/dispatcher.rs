//! Request/response multiplexing over one channel

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use wb_core::config::ReconnectConfig;
use wb_core::{BridgeConfig, ConnectionState, DispatchError, Endpoint, TransportError};
use wb_protocol::{correlation_id, encode_request, BroadcastEvent, Request, Response};

use super::pending::PendingRequests;
use crate::transport::{ChannelEvent, Transport};

/// Capacity of the broadcast event fan-out.
///
/// A subscriber that falls further behind than this loses the oldest
/// events instead of growing the buffer.
const BROADCAST_CHANNEL_CAPACITY: usize = 256;

/// Options for a [`Dispatcher`]
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// Timeout used by [`Dispatcher::send_command`]
    pub command_timeout: Duration,
    /// Limit for one connection attempt
    pub connect_timeout: Option<Duration>,
    /// Automatic reconnection after unexpected closure
    pub reconnect: ReconnectConfig,
    /// Connect on demand instead of failing with `NotConnected`
    pub auto_connect: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for DispatcherOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            command_timeout: config.command_timeout,
            connect_timeout: Some(config.connect_timeout),
            reconnect: config.reconnect,
            auto_connect: config.auto_connect,
        }
    }
}

/// Sends commands over a [`Transport`] and routes the replies
///
/// Inbound frames whose `id` matches an in-flight request settle that
/// request. Everything else is published to broadcast subscribers, or
/// dropped when there are none.
pub struct Dispatcher {
    transport: Transport,
    pending: Arc<PendingRequests>,
    broadcasts: broadcast::Sender<BroadcastEvent>,
    router: JoinHandle<()>,
    options: DispatcherOptions,
}

impl Dispatcher {
    /// Create a dispatcher for an endpoint
    ///
    /// Must be called within a Tokio runtime. The channel starts closed.
    pub fn new(endpoint: Endpoint, options: DispatcherOptions) -> Self {
        let (transport, events) =
            Transport::new(endpoint, &options.reconnect, options.connect_timeout);
        let pending = Arc::new(PendingRequests::new());
        let (broadcasts, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        let router = tokio::spawn(route_events(
            events,
            Arc::clone(&pending),
            broadcasts.clone(),
        ));

        Self {
            transport,
            pending,
            broadcasts,
            router,
            options,
        }
    }

    /// Endpoint this dispatcher talks to
    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }

    /// Open the channel
    pub async fn connect(&self) -> Result<(), TransportError> {
        self.transport.connect().await
    }

    /// Close the channel and fail every outstanding request
    pub fn disconnect(&self) {
        self.transport.disconnect();
        let rejected = self.pending.reject_all();
        if rejected > 0 {
            tracing::debug!("Rejected {} outstanding requests on disconnect", rejected);
        }
    }

    /// Whether the channel is open
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Channel state
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Automatic reconnect attempts made since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.transport.reconnect_attempts()
    }

    /// Channel closed for good: no reconnect pending or left to try
    pub fn reconnect_exhausted(&self) -> bool {
        self.transport.reconnect_exhausted()
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Receive frames that did not answer a request
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.broadcasts.subscribe()
    }

    /// Send a command using the configured timeout
    pub async fn send_command(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> Result<Response, DispatchError> {
        self.send_command_with_timeout(command, args, self.options.command_timeout)
            .await
    }

    /// Send a command and wait up to `timeout` for its response
    ///
    /// The response is returned whether or not it reports success; callers
    /// interpret `success` and `error` themselves.
    pub async fn send_command_with_timeout(
        &self,
        command: &str,
        args: Option<Value>,
        timeout: Duration,
    ) -> Result<Response, DispatchError> {
        if !self.transport.is_open() {
            if !self.options.auto_connect {
                return Err(DispatchError::NotConnected);
            }
            tracing::debug!("Channel closed, connecting before sending {}", command);
            self.transport.connect().await?;
        }
        let generation = self
            .transport
            .open_generation()
            .ok_or(DispatchError::NotConnected)?;

        let (request, rx) = loop {
            let request = Request::new(command, None);
            if let Some(rx) = self.pending.register(request.id.as_str(), generation) {
                break (request, rx);
            }
        };
        let request = Request { args, ..request };
        let id = request.id.as_str().to_string();

        let sent = encode_request(&request)
            .map_err(DispatchError::from)
            .and_then(|frame| self.transport.send(frame).map_err(DispatchError::from));
        if let Err(e) = sent {
            self.pending.remove(&id);
            return Err(e);
        }
        tracing::trace!("Sent {} as request {}", command, id);

        let mut rx = rx;
        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(DispatchError::ConnectionClosed { id }),
            Err(_) => {
                if self.pending.remove(&id) {
                    tracing::debug!("Request {} ({}) timed out after {:?}", id, command, timeout);
                    Err(DispatchError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    })
                } else {
                    // Settled between the deadline and the removal
                    rx.await
                        .unwrap_or(Err(DispatchError::ConnectionClosed { id }))
                }
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.transport.disconnect();
        self.pending.reject_all();
        self.router.abort();
    }
}

/// Route channel events until the channel is dropped
async fn route_events(
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    pending: Arc<PendingRequests>,
    broadcasts: broadcast::Sender<BroadcastEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Message(frame) => {
                let waiter = correlation_id(&frame).and_then(|id| pending.take(id));
                match waiter {
                    Some(waiter) => {
                        let response = Response::from_frame(waiter.id(), frame);
                        waiter.settle(response);
                    }
                    None => {
                        if broadcasts.send(BroadcastEvent(frame)).is_err() {
                            tracing::trace!("Dropping broadcast frame with no subscribers");
                        }
                    }
                }
            }
            ChannelEvent::Closed { generation } => {
                let rejected = pending.reject_through(generation);
                if rejected > 0 {
                    tracing::debug!("Rejected {} outstanding requests on close", rejected);
                }
            }
            ChannelEvent::Opened { generation } => {
                tracing::trace!("Channel generation {} open", generation);
            }
        }
    }
}
