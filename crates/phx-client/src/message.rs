//! Wire frame and event vocabulary.
//!
//! Every exchange in either direction is exactly one [`Message`]: a JSON
//! object carrying a topic, an event tag, an opaque payload, and a
//! correlation ref.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved sentinel topic for keep-alive traffic.
///
/// Inbound frames on this topic are discarded by the dispatch loop; outbound
/// heartbeats are addressed to it.
pub const HEARTBEAT_TOPIC: &str = "phoenix";

/// Protocol event tag carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Outbound request for entry into a topic.
    #[serde(rename = "phx_join")]
    Join,
    /// Inbound response correlated to a prior request via its ref.
    #[serde(rename = "phx_reply")]
    Reply,
    /// Application-defined message, either direction.
    #[serde(rename = "new_msg")]
    Message,
    /// Keep-alive on the reserved sentinel topic.
    #[serde(rename = "heartbeat")]
    Heartbeat,
    /// Any event name this client does not handle. Never delivered.
    #[serde(other)]
    Unknown,
}

/// One wire frame.
///
/// Immutable once constructed. `reference` is 0 for frames that are not part
/// of a request/reply correlation (broadcasts, heartbeats).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Topic the frame belongs to.
    pub topic: String,
    /// Protocol event tag.
    pub event: Event,
    /// Opaque application payload.
    #[serde(default)]
    pub payload: Value,
    /// Correlation ref echoed back by the peer in replies.
    #[serde(rename = "ref", default)]
    pub reference: u64,
}

/// Status field a `phx_reply` payload carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    /// The correlated request succeeded.
    Ok,
    /// The correlated request was rejected.
    Error,
    /// A status string this client does not recognize.
    Other(String),
}

impl Message {
    /// Build a join request frame.
    pub fn join(topic: impl Into<String>, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.into(),
            event: Event::Join,
            payload,
            reference,
        }
    }

    /// Build an application message frame.
    pub fn push(topic: impl Into<String>, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.into(),
            event: Event::Message,
            payload,
            reference,
        }
    }

    /// Build a keep-alive frame for the reserved topic.
    pub fn heartbeat() -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.to_owned(),
            event: Event::Heartbeat,
            payload: Value::Null,
            reference: 0,
        }
    }

    /// Extract the reply status from this frame's payload.
    ///
    /// Returns `None` when the payload is not a status-bearing object.
    pub fn reply_status(&self) -> Option<ReplyStatus> {
        let status = self.payload.as_object()?.get("status")?.as_str()?;
        Some(match status {
            "ok" => ReplyStatus::Ok,
            "error" => ReplyStatus::Error,
            other => ReplyStatus::Other(other.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_frame_serializes_to_wire_shape() {
        let msg = Message::join("room:lobby", Value::Null, 1);
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            wire,
            json!({"topic": "room:lobby", "event": "phx_join", "payload": null, "ref": 1})
        );
    }

    #[test]
    fn heartbeat_frame_targets_sentinel_topic_with_ref_zero() {
        let msg = Message::heartbeat();
        assert_eq!(msg.topic, HEARTBEAT_TOPIC);
        assert_eq!(msg.event, Event::Heartbeat);
        assert_eq!(msg.reference, 0);
    }

    #[test]
    fn reply_deserializes_from_wire() {
        let msg: Message = serde_json::from_str(
            r#"{"topic":"room:lobby","event":"phx_reply","payload":{"status":"ok"},"ref":1}"#,
        )
        .unwrap();
        assert_eq!(msg.event, Event::Reply);
        assert_eq!(msg.reference, 1);
        assert_eq!(msg.reply_status(), Some(ReplyStatus::Ok));
    }

    #[test]
    fn missing_ref_and_payload_default() {
        let msg: Message =
            serde_json::from_str(r#"{"topic":"phoenix","event":"heartbeat"}"#).unwrap();
        assert_eq!(msg.reference, 0);
        assert!(msg.payload.is_null());
    }

    #[test]
    fn unrecognized_event_decodes_to_unknown() {
        let msg: Message = serde_json::from_str(
            r#"{"topic":"room:lobby","event":"presence_diff","payload":{},"ref":0}"#,
        )
        .unwrap();
        assert_eq!(msg.event, Event::Unknown);
    }

    #[test]
    fn reply_status_error_with_reason() {
        let msg = Message {
            topic: "room:lobby".into(),
            event: Event::Reply,
            payload: json!({"status": "error", "reason": "unauthorized"}),
            reference: 1,
        };
        assert_eq!(msg.reply_status(), Some(ReplyStatus::Error));
    }

    #[test]
    fn reply_status_unrecognized_string() {
        let msg = Message {
            topic: "room:lobby".into(),
            event: Event::Reply,
            payload: json!({"status": "maybe"}),
            reference: 1,
        };
        assert_eq!(msg.reply_status(), Some(ReplyStatus::Other("maybe".into())));
    }

    #[test]
    fn reply_status_none_for_non_object_payload() {
        let msg = Message {
            topic: "room:lobby".into(),
            event: Event::Reply,
            payload: json!("ok"),
            reference: 1,
        };
        assert_eq!(msg.reply_status(), None);
    }
}
