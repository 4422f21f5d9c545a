//! # phx-client
//!
//! Client for Phoenix-style channels: join named topics over one WebSocket,
//! push typed events into them, and receive asynchronously delivered
//! messages and join acknowledgements, with a background keep-alive.
//!
//! The protocol engine is the interesting part:
//!
//! - **Reply correlation**: every outbound request carries a strictly
//!   increasing ref ([`refs::RefCounter`]); the peer echoes it back so the
//!   dispatch loop can match a reply to the join that caused it.
//! - **Join state machine**: each [`channel::Channel`] moves exactly once
//!   from `Joining` to `Joined` or `Errored`.
//! - **Single dispatch loop**: one task owns the read half of the socket and
//!   demultiplexes inbound frames to the right channel's callbacks.
//! - **One write path**: joins, pushes, and heartbeats from any task all go
//!   through [`transport::SharedSink`], so frames never interleave.
//!
//! ## Example
//!
//! ```no_run
//! use phx_client::{ChannelHandlers, Client, SocketConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), phx_client::SocketError> {
//! let mut config = SocketConfig::new("ws://localhost:4000/socket/websocket");
//! let _ = config.params.insert("user".into(), "alice".into());
//! let client = Client::connect(config).await?;
//!
//! let handlers = ChannelHandlers {
//!     on_message: Some(Arc::new(|payload| println!("new message: {payload}"))),
//!     ..ChannelHandlers::default()
//! };
//! let lobby = client.channel_with("room:lobby", handlers).await?;
//! // ... once the join is acknowledged:
//! lobby.push(json!({"body": "hello"})).await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod error;
pub mod message;
pub mod refs;
pub mod socket;
pub mod transport;

pub use channel::{Channel, ChannelHandlers, ChannelState, PayloadHandler};
pub use client::{Client, SocketConfig};
pub use error::{ProtocolViolation, SocketError};
pub use message::{Event, HEARTBEAT_TOPIC, Message, ReplyStatus};
pub use transport::{SharedSink, TransportSink, TransportStream};
