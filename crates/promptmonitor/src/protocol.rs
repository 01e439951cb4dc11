//! Typed message envelopes exchanged with the coordinator.
//!
//! Every request is a [`Message`] with a `kind` tag and a `payload`, and every
//! request gets exactly one [`Reply`]. [`Notification`]s flow the other way
//! and are never answered.
//!
//! ```
//! use promptmonitor::protocol::Message;
//!
//! let msg = Message::DismissIdentifier { identifier: "a@b.com".into() };
//! let json = serde_json::to_string(&msg).unwrap();
//! assert_eq!(json, r#"{"kind":"DISMISS_IDENTIFIER","payload":{"identifier":"a@b.com"}}"#);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consent::ConsentDecision;
use crate::model::{DetectionItem, StateSnapshot, StateUpdate, SuppressionEntry};

/// A request addressed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Record the identifiers in a forwarded prompt.
    ScanPayload {
        /// The prompt text.
        body: String,
        /// Destination URL of the request.
        url: String,
    },
    /// Suppress an identifier for the suppression window.
    DismissIdentifier {
        /// The identifier, any casing.
        identifier: String,
    },
    /// Drop all history and session detections.
    ClearHistory,
    /// Fetch the full state snapshot.
    GetState,
    /// Fetch the active suppressions only.
    GetSuppressions,
}

impl Message {
    /// The wire name of this message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScanPayload { .. } => "SCAN_PAYLOAD",
            Self::DismissIdentifier { .. } => "DISMISS_IDENTIFIER",
            Self::ClearHistory => "CLEAR_HISTORY",
            Self::GetState => "GET_STATE",
            Self::GetSuppressions => "GET_SUPPRESSIONS",
        }
    }
}

/// Outcome of a `SCAN_PAYLOAD` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    /// Unique identifiers found in the body, suppressed ones included.
    pub found_identifiers: Vec<String>,
    /// The body with every found identifier redacted.
    pub redacted_body: String,
    /// Whether any unsuppressed identifier was found.
    pub should_block: bool,
    /// Detections that were recorded.
    pub new_items: Vec<DetectionItem>,
}

/// The coordinator's answer to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    /// Answer to `SCAN_PAYLOAD`.
    ScanResult(ScanOutcome),
    /// Answer to `DISMISS_IDENTIFIER` and `CLEAR_HISTORY`.
    Ack {
        /// Whether the command took effect.
        success: bool,
    },
    /// Answer to `GET_STATE`.
    State(StateSnapshot),
    /// Answer to `GET_SUPPRESSIONS`.
    Suppressions {
        /// Active entries, most recent first.
        suppressions: Vec<SuppressionEntry>,
    },
}

impl Reply {
    /// The wire name of this reply kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScanResult(_) => "SCAN_RESULT",
            Self::Ack { .. } => "ACK",
            Self::State(_) => "STATE",
            Self::Suppressions { .. } => "SUPPRESSIONS",
        }
    }
}

/// Pushed from the coordinator to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// The persisted state changed.
    StateUpdated(StateUpdate),
}

/// What the interceptor reports after forwarding a request that carried identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    /// The consent decision that let the request through.
    pub action: ConsentDecision,
    /// Identifiers the user was asked about.
    pub identifiers: Vec<String>,
    /// Destination URL of the request.
    pub url: String,
    /// The prompt text before any rewrite.
    pub prompt: String,
    /// When the request was forwarded.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl DetectionEvent {
    /// The message that records this event with the coordinator.
    ///
    /// Only the prompt and URL travel. The coordinator re-detects and
    /// re-filters against its own suppression list, so `identifiers` and
    /// `action` are not needed, and `detectedAt` on the stored items is the
    /// coordinator's receive time rather than `timestamp`.
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message::ScanPayload {
            body: self.prompt.clone(),
            url: self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kinds_match_wire_tags() {
        let messages = vec![
            Message::ScanPayload {
                body: "b".into(),
                url: "u".into(),
            },
            Message::DismissIdentifier {
                identifier: "a@b.com".into(),
            },
            Message::ClearHistory,
            Message::GetState,
            Message::GetSuppressions,
        ];

        for msg in messages {
            let json = serde_json::to_value(&msg).unwrap();
            assert_eq!(json["kind"], msg.kind());
        }
    }

    #[test]
    fn test_unit_message_has_no_payload() {
        let json = serde_json::to_string(&Message::ClearHistory).unwrap();
        assert_eq!(json, r#"{"kind":"CLEAR_HISTORY"}"#);
    }

    #[test]
    fn test_scan_payload_from_wire() {
        let msg: Message = serde_json::from_str(
            r#"{"kind":"SCAN_PAYLOAD","payload":{"body":"hi a@b.com","url":"https://x"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            Message::ScanPayload {
                body: "hi a@b.com".into(),
                url: "https://x".into()
            }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: std::result::Result<Message, _> =
            serde_json::from_str(r#"{"kind":"REBOOT"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_outcome_field_names() {
        let reply = Reply::ScanResult(ScanOutcome::default());
        let json = serde_json::to_value(&reply).unwrap();

        assert_eq!(json["kind"], "SCAN_RESULT");
        let payload = &json["payload"];
        assert!(payload.get("foundIdentifiers").is_some());
        assert!(payload.get("redactedBody").is_some());
        assert!(payload.get("shouldBlock").is_some());
        assert!(payload.get("newItems").is_some());
    }

    #[test]
    fn test_ack_wire_shape() {
        let json = serde_json::to_string(&Reply::Ack { success: true }).unwrap();
        assert_eq!(json, r#"{"kind":"ACK","payload":{"success":true}}"#);
    }

    #[test]
    fn test_state_updated_wire_shape() {
        let json = serde_json::to_value(Notification::StateUpdated(StateUpdate::default())).unwrap();
        assert_eq!(json["kind"], "STATE_UPDATED");
        assert!(json["payload"]["history"].is_array());
        assert!(json["payload"]["suppressions"].is_array());
    }

    #[test]
    fn test_detection_event_to_message() {
        let event = DetectionEvent {
            action: ConsentDecision::Anonymize,
            identifiers: vec!["a@b.com".into()],
            url: "https://x/backend-api/conversation".into(),
            prompt: "mail a@b.com".into(),
            timestamp: Utc::now(),
        };

        assert_eq!(
            event.to_message(),
            Message::ScanPayload {
                body: "mail a@b.com".into(),
                url: "https://x/backend-api/conversation".into()
            }
        );
    }
}
