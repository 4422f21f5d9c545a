//! Per-topic channel state machine.
//!
//! A channel is created and registered by [`Client::channel`]; its join
//! completes asynchronously when the dispatch loop routes the matching
//! reply. Application callbacks are invoked only by the dispatch loop, never
//! from `join`/`push` directly.
//!
//! [`Client::channel`]: crate::client::Client::channel

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::error::SocketError;
use crate::message::Message;
use crate::refs::RefCounter;
use crate::transport::{SharedSink, TransportSink};

/// Lifecycle of a channel's join handshake.
///
/// Transitions at most once, from `Joining` to either `Joined` or `Errored`.
/// Both destination states are terminal; there is no leave or rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Join request sent, reply not yet received.
    Joining,
    /// The peer acknowledged the join.
    Joined,
    /// The peer rejected the join; the channel has been unregistered.
    Errored,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Errored => "errored",
        })
    }
}

/// Callback invoked with a frame payload.
pub type PayloadHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Optional per-channel callbacks.
///
/// Handlers left unset default to log-only no-ops at construction time.
#[derive(Clone, Default)]
pub struct ChannelHandlers {
    /// Invoked once with the reply payload when the join is acknowledged.
    pub on_join: Option<PayloadHandler>,
    /// Invoked once with the reply payload when the join is rejected.
    pub on_join_error: Option<PayloadHandler>,
    /// Invoked with the payload of every message frame for this topic.
    pub on_message: Option<PayloadHandler>,
}

/// One joined (or joining) topic.
pub struct Channel<S> {
    topic: String,
    sender: SharedSink<S>,
    refs: Arc<RefCounter>,
    /// Ref of the most recent (and only) join request; 0 until `join` runs.
    join_ref: AtomicU64,
    state: RwLock<ChannelState>,
    on_join: PayloadHandler,
    on_join_error: PayloadHandler,
    on_message: PayloadHandler,
}

impl<S> fmt::Debug for Channel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("topic", &self.topic)
            .field("join_ref", &self.join_ref)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl<S: TransportSink> Channel<S> {
    pub(crate) fn new(
        topic: impl Into<String>,
        sender: SharedSink<S>,
        refs: Arc<RefCounter>,
        handlers: ChannelHandlers,
    ) -> Self {
        let topic = topic.into();
        Self {
            sender,
            refs,
            join_ref: AtomicU64::new(0),
            state: RwLock::new(ChannelState::Joining),
            on_join: handlers
                .on_join
                .unwrap_or_else(|| default_handler(topic.clone(), "channel joined")),
            on_join_error: handlers
                .on_join_error
                .unwrap_or_else(|| default_handler(topic.clone(), "channel join rejected")),
            on_message: handlers
                .on_message
                .unwrap_or_else(|| default_handler(topic.clone(), "message received")),
            topic,
        }
    }

    /// The topic this channel is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Current join state.
    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    /// Ref that correlates the pending join reply.
    pub(crate) fn join_ref(&self) -> u64 {
        self.join_ref.load(Ordering::Acquire)
    }

    /// Send the join request. Completion arrives later through the dispatch
    /// loop; a `Ok` here only means the frame was handed to the transport.
    pub(crate) async fn join(&self, payload: Value) -> Result<(), SocketError> {
        let reference = self.refs.next();
        self.join_ref.store(reference, Ordering::Release);
        *self.state.write() = ChannelState::Joining;
        self.sender
            .send(Message::join(self.topic.clone(), payload, reference))
            .await
    }

    /// Push an application payload into the topic.
    ///
    /// Rejected with [`SocketError::NotJoined`] until the peer has
    /// acknowledged the join; waiting for the join callback before pushing is
    /// the expected usage.
    pub async fn push(&self, payload: Value) -> Result<(), SocketError> {
        let state = self.state();
        if state != ChannelState::Joined {
            return Err(SocketError::NotJoined {
                topic: self.topic.clone(),
                state,
            });
        }
        self.sender
            .send(Message::push(self.topic.clone(), payload, self.refs.next()))
            .await
    }

    /// Dispatch-loop entry: the peer acknowledged the join.
    pub(crate) fn handle_join_ok(&self, payload: &Value) {
        if !self.transition(ChannelState::Joined) {
            return;
        }
        (self.on_join)(payload);
    }

    /// Dispatch-loop entry: the peer rejected the join.
    pub(crate) fn handle_join_error(&self, payload: &Value) {
        if !self.transition(ChannelState::Errored) {
            return;
        }
        (self.on_join_error)(payload);
    }

    /// Dispatch-loop entry: a message frame arrived for this topic.
    pub(crate) fn handle_message(&self, payload: &Value) {
        (self.on_message)(payload);
    }

    /// Move out of `Joining` exactly once. Late duplicate replies lose.
    fn transition(&self, to: ChannelState) -> bool {
        let mut state = self.state.write();
        if *state != ChannelState::Joining {
            return false;
        }
        *state = to;
        true
    }
}

fn default_handler(topic: String, what: &'static str) -> PayloadHandler {
    Arc::new(move |payload| info!(topic = %topic, ?payload, "{what}"))
}
