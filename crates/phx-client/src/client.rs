//! Client orchestration: connect/disconnect, the channel registry, the
//! heartbeat task, and the single inbound dispatch loop.
//!
//! ## Data flow
//!
//! `Client::channel(topic)` registers a [`Channel`] and sends its join frame
//! through the shared write path. The dispatch loop — the only reader of the
//! transport — receives one frame at a time, discards heartbeat-topic
//! frames, and routes the rest to the owning channel's callbacks. A second
//! background task ticks the keep-alive. All three contexts write through
//! [`SharedSink`], so frames never interleave on the wire.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::channel::{Channel, ChannelHandlers};
use crate::error::{ProtocolViolation, SocketError};
use crate::message::{Event, HEARTBEAT_TOPIC, Message, ReplyStatus};
use crate::refs::RefCounter;
use crate::socket::{self, WsSink};
use crate::transport::{SharedSink, TransportSink, TransportStream};

/// Callback invoked once when the connection is established.
pub type ConnectHandler = Box<dyn FnOnce() + Send>;
/// Callback invoked once when establishing the connection fails.
pub type ConnectErrorHandler = Box<dyn FnOnce(&SocketError) + Send>;

/// Topic → channel mapping, shared between `channel()` callers and the
/// dispatch loop.
type Registry<S> = Arc<RwLock<HashMap<String, Arc<Channel<S>>>>>;

/// Connection configuration.
///
/// Callbacks left unset default to log-only no-ops.
pub struct SocketConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:4000/socket/websocket`.
    pub url: String,
    /// Query parameters appended to the endpoint URL.
    pub params: HashMap<String, String>,
    /// Keep-alive cadence.
    pub heartbeat_interval: Duration,
    /// Invoked exactly once after the socket is established.
    pub on_connect: Option<ConnectHandler>,
    /// Invoked exactly once if the dial fails.
    pub on_connect_error: Option<ConnectErrorHandler>,
}

impl SocketConfig {
    /// Configuration for `url` with default heartbeat cadence and callbacks.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: HashMap::new(),
            heartbeat_interval: Duration::from_secs(10),
            on_connect: None,
            on_connect_error: None,
        }
    }
}

/// A connected client: one socket, one dispatch loop, one heartbeat.
pub struct Client<S> {
    sender: SharedSink<S>,
    channels: Registry<S>,
    refs: Arc<RefCounter>,
    heartbeat: JoinHandle<()>,
    dispatch: JoinHandle<()>,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("heartbeat", &self.heartbeat)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

impl Client<WsSink> {
    /// Dial the configured endpoint and start the background tasks.
    ///
    /// The connect callback (success or error) fires exactly once, before
    /// the heartbeat and dispatch tasks are live. Configuration problems are
    /// returned without attempting a connection and without invoking either
    /// callback.
    pub async fn connect(mut config: SocketConfig) -> Result<Self, SocketError> {
        if config.url.trim().is_empty() {
            return Err(SocketError::Config {
                reason: "endpoint url is required".into(),
            });
        }
        match socket::dial(&config.url, &config.params).await {
            Ok((sink, stream)) => {
                if let Some(on_connect) = config.on_connect.take() {
                    on_connect();
                } else {
                    info!(url = %config.url, "connected");
                }
                Ok(Self::start(sink, stream, config.heartbeat_interval))
            }
            Err(err) => {
                if let Some(on_connect_error) = config.on_connect_error.take() {
                    on_connect_error(&err);
                } else {
                    error!(url = %config.url, error = %err, "connect failed");
                }
                Err(err)
            }
        }
    }
}

impl<S: TransportSink> Client<S> {
    /// Wire a client onto an already-established transport.
    ///
    /// Spawns the heartbeat and dispatch tasks immediately. [`Client::connect`]
    /// is the production path; this seam exists so the protocol engine can run
    /// over any transport.
    pub fn start<R: TransportStream>(sink: S, stream: R, heartbeat_interval: Duration) -> Self {
        let sender = SharedSink::new(sink);
        let channels: Registry<S> = Arc::new(RwLock::new(HashMap::new()));
        let heartbeat = tokio::spawn(heartbeat_loop(sender.clone(), heartbeat_interval));
        let dispatch = tokio::spawn(dispatch_loop(stream, Arc::clone(&channels)));
        Self {
            sender,
            channels,
            refs: Arc::new(RefCounter::new()),
            heartbeat,
            dispatch,
        }
    }

    /// Create and join a channel for `topic` with log-only callbacks.
    pub async fn channel(&self, topic: &str) -> Result<Arc<Channel<S>>, SocketError> {
        self.channel_with(topic, ChannelHandlers::default()).await
    }

    /// Create and join a channel for `topic`.
    ///
    /// Fails with [`SocketError::ChannelExists`] if the topic is already
    /// registered. The returned channel is still `Joining`; the join result
    /// arrives through the handlers. If sending the join frame fails, the
    /// topic is unregistered again before the error is returned.
    pub async fn channel_with(
        &self,
        topic: &str,
        handlers: ChannelHandlers,
    ) -> Result<Arc<Channel<S>>, SocketError> {
        let channel = {
            let mut channels = self.channels.write().await;
            if channels.contains_key(topic) {
                return Err(SocketError::ChannelExists {
                    topic: topic.to_owned(),
                });
            }
            let channel = Arc::new(Channel::new(
                topic,
                self.sender.clone(),
                Arc::clone(&self.refs),
                handlers,
            ));
            let _ = channels.insert(topic.to_owned(), Arc::clone(&channel));
            channel
        };

        if let Err(err) = channel.join(Value::Null).await {
            let _ = self.channels.write().await.remove(topic);
            return Err(err);
        }
        Ok(channel)
    }

    /// Tear down the background tasks.
    ///
    /// The connection is not reusable afterwards; reconnection is the
    /// caller's concern.
    pub fn disconnect(self) {
        self.heartbeat.abort();
        self.dispatch.abort();
        info!("disconnected");
    }
}

/// Periodically send a keep-alive frame to the reserved topic.
///
/// Send failures are logged, never fatal; the dispatch loop is the sole
/// judge of connection death.
async fn heartbeat_loop<S: TransportSink>(sender: SharedSink<S>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        let _ = ticker.tick().await;
        if let Err(err) = sender.send(Message::heartbeat()).await {
            warn!(error = %err, "heartbeat send failed");
        }
    }
}

/// Receive frames one at a time and route each to its channel.
///
/// Runs until the transport reports a receive error; that is fatal to the
/// connection. Per-frame routing problems are logged and dropped so a single
/// malformed frame never tears down a healthy connection.
async fn dispatch_loop<S: TransportSink, R: TransportStream>(mut stream: R, channels: Registry<S>) {
    loop {
        let message = match stream.receive().await {
            Ok(message) => message,
            Err(err) => {
                error!(error = %err, "receive failed, connection closed");
                break;
            }
        };
        if message.topic == HEARTBEAT_TOPIC {
            continue;
        }
        debug!(topic = %message.topic, event = ?message.event, reference = message.reference, "received frame");
        if let Err(violation) = route(&message, &channels).await {
            warn!(error = %violation, "dropping frame");
        }
    }
}

/// Route one inbound frame to its channel's callbacks.
///
/// Only `message` frames and replies matching the channel's join ref are
/// actionable; everything else is deliberately not delivered.
async fn route<S: TransportSink>(
    message: &Message,
    channels: &Registry<S>,
) -> Result<(), ProtocolViolation> {
    let channel = {
        let map = channels.read().await;
        map.get(&message.topic).cloned()
    }
    .ok_or_else(|| ProtocolViolation::UnknownTopic {
        topic: message.topic.clone(),
    })?;

    match message.event {
        Event::Reply if message.reference == channel.join_ref() => {
            match message.reply_status() {
                Some(ReplyStatus::Ok) => channel.handle_join_ok(&message.payload),
                Some(ReplyStatus::Error) => {
                    // Unregister first so the topic is registrable again by
                    // the time the error callback observes the rejection.
                    let _ = channels.write().await.remove(&message.topic);
                    channel.handle_join_error(&message.payload);
                }
                Some(ReplyStatus::Other(status)) => {
                    return Err(ProtocolViolation::UnknownStatus {
                        topic: message.topic.clone(),
                        status,
                    });
                }
                None => {
                    return Err(ProtocolViolation::MalformedReply {
                        topic: message.topic.clone(),
                    });
                }
            }
        }
        Event::Message => channel.handle_message(&message.payload),
        _ => trace!(topic = %message.topic, event = ?message.event, "frame not actionable"),
    }
    Ok(())
}
