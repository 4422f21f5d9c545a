//! Error taxonomies for the socket client.
//!
//! [`SocketError`] covers operation results surfaced to the application.
//! [`ProtocolViolation`] covers per-frame problems detected by the dispatch
//! loop; those are logged and dropped rather than tearing down the
//! connection.

use thiserror::Error;

use crate::channel::ChannelState;

/// Errors surfaced by the socket client and its channels.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Client configuration was rejected before any connection attempt.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Dialing the WebSocket endpoint failed.
    #[error("connect failed for {url}: {reason}")]
    ConnectFailed {
        /// The endpoint that refused us.
        url: String,
        /// Why the dial failed.
        reason: String,
    },

    /// The transport failed to send or receive a frame.
    ///
    /// Inside the dispatch loop this is fatal to the connection; from
    /// `push`/`join` it fails only that operation.
    #[error("transport error: {context}")]
    Transport {
        /// What the transport was doing when it failed.
        context: String,
    },

    /// A channel is already registered for the topic.
    #[error("channel already exists for topic '{topic}'")]
    ChannelExists {
        /// The duplicate topic.
        topic: String,
    },

    /// Push on a channel whose join handshake has not completed.
    #[error("channel '{topic}' is not joined (state: {state})")]
    NotJoined {
        /// The channel's topic.
        topic: String,
        /// The state the channel was in.
        state: ChannelState,
    },

    /// The peer sent a frame the dispatch loop could not route.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
}

/// A per-frame protocol problem detected while routing an inbound frame.
///
/// A single bad frame never terminates the dispatch loop; each violation is
/// logged and the frame dropped.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    /// Frame addressed to a topic with no registered channel.
    #[error("frame for unknown topic '{topic}'")]
    UnknownTopic {
        /// The unregistered topic.
        topic: String,
    },

    /// Join reply carried a status other than `ok` or `error`.
    #[error("unrecognized reply status '{status}' for topic '{topic}'")]
    UnknownStatus {
        /// The channel's topic.
        topic: String,
        /// The status string the peer sent.
        status: String,
    },

    /// Join reply payload was not a status-bearing object.
    #[error("reply payload for topic '{topic}' carries no status")]
    MalformedReply {
        /// The channel's topic.
        topic: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display() {
        let err = SocketError::Config {
            reason: "endpoint url is required".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: endpoint url is required"
        );
    }

    #[test]
    fn connect_failed_display() {
        let err = SocketError::ConnectFailed {
            url: "ws://localhost:4000/socket/websocket".into(),
            reason: "connection refused".into(),
        };
        assert!(err.to_string().contains("ws://localhost:4000"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn channel_exists_display() {
        let err = SocketError::ChannelExists {
            topic: "room:lobby".into(),
        };
        assert_eq!(
            err.to_string(),
            "channel already exists for topic 'room:lobby'"
        );
    }

    #[test]
    fn not_joined_display() {
        let err = SocketError::NotJoined {
            topic: "room:lobby".into(),
            state: ChannelState::Joining,
        };
        assert!(err.to_string().contains("room:lobby"));
        assert!(err.to_string().contains("joining"));
    }

    #[test]
    fn unknown_topic_display() {
        let err = ProtocolViolation::UnknownTopic {
            topic: "room:ghost".into(),
        };
        assert_eq!(err.to_string(), "frame for unknown topic 'room:ghost'");
    }

    #[test]
    fn unknown_status_display() {
        let err = ProtocolViolation::UnknownStatus {
            topic: "room:lobby".into(),
            status: "maybe".into(),
        };
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn violation_converts_to_socket_error() {
        let err: SocketError = ProtocolViolation::MalformedReply {
            topic: "room:lobby".into(),
        }
        .into();
        assert!(err.to_string().starts_with("protocol violation:"));
    }
}
