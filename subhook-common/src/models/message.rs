// File: subhook-common/src/models/message.rs

use serde::{Deserialize, Serialize};

use super::subscription::Subscription;

/// Request headers sent by the remote service on every webhook delivery.
pub mod headers {
    pub const MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
    pub const MESSAGE_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
    pub const MESSAGE_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";
    pub const MESSAGE_TYPE: &str = "Twitch-Eventsub-Message-Type";
    pub const MESSAGE_RETRY: &str = "Twitch-Eventsub-Message-Retry";
    pub const SUBSCRIPTION_TYPE: &str = "Twitch-Eventsub-Subscription-Type";
    pub const SUBSCRIPTION_VERSION: &str = "Twitch-Eventsub-Subscription-Version";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Notification,
    Verification,
    Revocation,
    /// Anything else the remote service might start sending.
    Unknown(String),
}

impl MessageKind {
    pub fn from_header(value: &str) -> Self {
        match value {
            "notification" => MessageKind::Notification,
            "webhook_callback_verification" => MessageKind::Verification,
            "revocation" => MessageKind::Revocation,
            other => MessageKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Notification => "notification",
            MessageKind::Verification => "webhook_callback_verification",
            MessageKind::Revocation => "revocation",
            MessageKind::Unknown(s) => s.as_str(),
        }
    }
}

/// JSON body of every webhook delivery:
/// `{ "challenge"?: "...", "subscription": {...}, "event"?: {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    pub subscription: Subscription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<serde_json::Value>,
}

/// One authenticated inbound delivery, built fresh per request and never stored.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub kind: MessageKind,
    pub message_id: String,
    pub timestamp: String,
    pub payload: WebhookPayload,
}

impl InboundMessage {
    pub fn subscription(&self) -> &Subscription {
        &self.payload.subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_round_trips_known_values() {
        for raw in ["notification", "webhook_callback_verification", "revocation"] {
            assert_eq!(MessageKind::from_header(raw).as_str(), raw);
        }
        assert_eq!(
            MessageKind::from_header("session_keepalive"),
            MessageKind::Unknown("session_keepalive".into())
        );
    }

    #[test]
    fn payload_parses_verification_body() {
        let body = r#"{"challenge":"abc123","subscription":{"id":"sub-1","type":"stream.online"}}"#;
        let payload: WebhookPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.challenge.as_deref(), Some("abc123"));
        assert_eq!(payload.subscription.id, "sub-1");
        assert!(payload.event.is_none());
    }
}
