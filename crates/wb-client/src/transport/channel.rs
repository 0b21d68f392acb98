//! WebSocket channel to the bridge plugin
//!
//! Owns one socket at a time. Each successful open gets a fresh generation
//! number so that late notifications from a previous socket can be told
//! apart from the current one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use wb_core::config::ReconnectConfig;
use wb_core::{ConnectionState, Endpoint, TransportError};
use wb_protocol::decode_frame;

use super::reconnect::LinearBackoff;

/// Events surfaced by the channel to its owner
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A socket finished its handshake
    Opened { generation: u64 },
    /// A decoded inbound frame
    Message(Value),
    /// The socket with this generation went away
    Closed { generation: u64 },
}

enum ChannelState {
    Closed,
    Connecting,
    Open(OpenChannel),
    Closing { generation: u64 },
}

struct OpenChannel {
    generation: u64,
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
}

struct Shared {
    endpoint: Endpoint,
    connect_timeout: Option<Duration>,
    backoff: LinearBackoff,
    state: Mutex<ChannelState>,
    generations: AtomicU64,
    /// Bumped by every explicit disconnect
    epoch: AtomicU64,
    events: mpsc::UnboundedSender<ChannelEvent>,
    connect_lock: tokio::sync::Mutex<()>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

/// Resets a `Connecting` state left behind by a failed or cancelled attempt
struct ConnectingGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.shared.state.lock();
            if matches!(*state, ChannelState::Connecting) {
                *state = ChannelState::Closed;
            }
        }
    }
}

/// A reconnecting WebSocket channel to one endpoint
pub struct Transport {
    shared: Arc<Shared>,
}

impl Transport {
    /// Create a closed channel and the receiver for its events
    pub fn new(
        endpoint: Endpoint,
        reconnect: &ReconnectConfig,
        connect_timeout: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            endpoint,
            connect_timeout,
            backoff: LinearBackoff::from_config(reconnect),
            state: Mutex::new(ChannelState::Closed),
            generations: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            events,
            connect_lock: tokio::sync::Mutex::new(()),
            reconnect_task: Mutex::new(None),
        });
        (Self { shared }, events_rx)
    }

    /// Endpoint this channel connects to
    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    /// Open the socket
    ///
    /// Returns immediately if it is already open.
    pub async fn connect(&self) -> Result<(), TransportError> {
        self.shared.connect().await
    }

    /// Queue a text frame for writing
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        match &*self.shared.state.lock() {
            ChannelState::Open(channel) => channel
                .outbound
                .send(Message::Text(text.into()))
                .map_err(|_| TransportError::NotOpen),
            _ => Err(TransportError::NotOpen),
        }
    }

    /// Close the socket and suppress automatic reconnection
    pub fn disconnect(&self) {
        let shared = &self.shared;
        shared.epoch.fetch_add(1, Ordering::SeqCst);
        shared.backoff.exhaust();
        if let Some(task) = shared.reconnect_task.lock().take() {
            task.abort();
        }

        let closing = {
            let mut state = shared.state.lock();
            match std::mem::replace(&mut *state, ChannelState::Closed) {
                ChannelState::Open(channel) => {
                    *state = ChannelState::Closing {
                        generation: channel.generation,
                    };
                    Some(channel)
                }
                _ => None,
            }
        };

        if let Some(channel) = closing {
            let generation = channel.generation;
            channel.reader.abort();
            // Dropping the sender lets the writer send a close frame and exit
            drop(channel.outbound);
            tracing::info!("Disconnected from {}", shared.endpoint);
            let _ = shared.events.send(ChannelEvent::Closed { generation });
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        match &*self.shared.state.lock() {
            ChannelState::Closed => ConnectionState::Closed,
            ChannelState::Connecting => ConnectionState::Connecting,
            ChannelState::Open(_) => ConnectionState::Open,
            ChannelState::Closing { .. } => ConnectionState::Closing,
        }
    }

    /// Whether frames can be written right now
    pub fn is_open(&self) -> bool {
        matches!(*self.shared.state.lock(), ChannelState::Open(_))
    }

    /// Generation of the open socket, if any
    pub fn open_generation(&self) -> Option<u64> {
        match &*self.shared.state.lock() {
            ChannelState::Open(channel) => Some(channel.generation),
            _ => None,
        }
    }

    /// Automatic reconnect attempts made since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.backoff.attempts()
    }

    /// Closed with no reconnect pending or left to try
    ///
    /// Stays true until [`Transport::connect`] is called explicitly.
    pub fn reconnect_exhausted(&self) -> bool {
        let shared = &self.shared;
        if !matches!(*shared.state.lock(), ChannelState::Closed) {
            return false;
        }
        let pending = shared
            .reconnect_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished());
        !pending && shared.backoff.attempts() >= shared.backoff.max_attempts()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Shared {
    async fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        let _serial = self.connect_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            if matches!(*state, ChannelState::Open(_)) {
                return Ok(());
            }
            *state = ChannelState::Connecting;
        }
        let mut guard = ConnectingGuard {
            shared: self.as_ref(),
            armed: true,
        };

        let url = self.endpoint.ws_url();
        tracing::debug!("Connecting to {}", url);

        let handshake = connect_async(url.as_str());
        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake).await.map_err(|_| {
                TransportError::ConnectTimeout {
                    endpoint: self.endpoint.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }
            })?,
            None => handshake.await,
        };
        let (socket, _response) = result.map_err(|e| TransportError::ConnectFailed {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Disconnected while connecting to {}", self.endpoint);
            return Err(TransportError::NotOpen);
        }

        let (mut sink, mut stream) = socket.split();
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let weak: Weak<Shared> = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::debug!("WebSocket write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            if let Some(shared) = weak.upgrade() {
                shared.finish_closing(generation);
            }
        });

        let _ = self.events.send(ChannelEvent::Opened { generation });

        let mut state = self.state.lock();
        let weak = Arc::downgrade(self);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match frame {
                    Ok(Message::Text(text)) => shared.deliver(text.as_str()),
                    Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                        Ok(text) => shared.deliver(text),
                        Err(_) => tracing::trace!("Dropping non-UTF-8 binary frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("WebSocket read failed: {}", e);
                        break;
                    }
                }
            }
            if let Some(shared) = weak.upgrade() {
                shared.handle_close(generation);
            }
        });
        *state = ChannelState::Open(OpenChannel {
            generation,
            outbound,
            reader,
        });
        drop(state);

        guard.armed = false;
        self.backoff.reset();
        tracing::info!("Connected to {}", self.endpoint);
        Ok(())
    }

    fn deliver(&self, text: &str) {
        match decode_frame(text) {
            Ok(frame) => {
                let _ = self.events.send(ChannelEvent::Message(frame));
            }
            Err(e) => tracing::trace!("Dropping undecodable frame: {}", e),
        }
    }

    fn handle_close(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.state.lock();
            match &*state {
                ChannelState::Open(channel) if channel.generation == generation => {}
                _ => return,
            }
            *state = ChannelState::Closed;
        }

        tracing::warn!("Connection to {} closed unexpectedly", self.endpoint);
        let _ = self.events.send(ChannelEvent::Closed { generation });
        self.schedule_reconnect();
    }

    fn finish_closing(&self, generation: u64) {
        let mut state = self.state.lock();
        if matches!(*state, ChannelState::Closing { generation: g } if g == generation) {
            *state = ChannelState::Closed;
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            loop {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let Some((attempt, delay)) = shared.backoff.next_delay() else {
                    tracing::debug!(
                        "No reconnect attempts left for {} ({} made)",
                        shared.endpoint,
                        shared.backoff.attempts()
                    );
                    return;
                };
                drop(shared);

                tracing::debug!("Reconnect attempt {} in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;

                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match shared.connect().await {
                    Ok(()) => {
                        tracing::info!("Reconnected to {}", shared.endpoint);
                        return;
                    }
                    Err(e) => tracing::debug!("Reconnect attempt {} failed: {}", attempt, e),
                }
            }
        });

        if let Some(previous) = self.reconnect_task.lock().replace(task) {
            previous.abort();
        }
    }
}
