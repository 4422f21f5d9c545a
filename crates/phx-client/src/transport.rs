//! Transport seam: framed send/receive halves and the single write path.
//!
//! The client never touches the wire directly. Outbound frames go through
//! [`SharedSink`], the one lock-guarded write path; inbound frames are read
//! by exactly one task, the client's dispatch loop, which owns the
//! [`TransportStream`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::SocketError;
use crate::message::Message;

/// Write half of an established connection.
///
/// Implementations are not required to tolerate concurrent callers;
/// serialization is provided by [`SharedSink`].
#[async_trait]
pub trait TransportSink: Send + 'static {
    /// Write one frame. Must either write the whole frame or fail.
    async fn send(&mut self, message: Message) -> Result<(), SocketError>;
}

/// Read half of an established connection.
#[async_trait]
pub trait TransportStream: Send + 'static {
    /// Block until the next frame arrives, or fail when the connection dies.
    async fn receive(&mut self) -> Result<Message, SocketError>;
}

/// The single write path to the wire.
///
/// Joins, pushes, and heartbeats may fire from different tasks at the same
/// time; the mutex here is held across each full write so frames never
/// interleave. Errors from the underlying sink propagate unchanged — no
/// retries.
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TransportSink> SharedSink<S> {
    /// Wrap a sink in the shared write lock.
    pub fn new(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Send one frame, holding the write lock for the duration of the write.
    pub async fn send(&self, message: Message) -> Result<(), SocketError> {
        let mut sink = self.inner.lock().await;
        sink.send(message).await
    }
}
