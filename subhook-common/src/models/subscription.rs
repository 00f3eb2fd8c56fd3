// File: subhook-common/src/models/subscription.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription statuses reported by the remote service. A revocation carries
/// its reason in this field.
pub mod status {
    pub const ENABLED: &str = "enabled";
    pub const VERIFICATION_PENDING: &str = "webhook_callback_verification_pending";
    pub const VERIFICATION_FAILED: &str = "webhook_callback_verification_failed";
    pub const NOTIFICATION_FAILURES_EXCEEDED: &str = "notification_failures_exceeded";
    pub const AUTHORIZATION_REVOKED: &str = "authorization_revoked";
    pub const MODERATOR_REMOVED: &str = "moderator_removed";
    pub const USER_REMOVED: &str = "user_removed";
    pub const VERSION_REMOVED: &str = "version_removed";
}

/// A standing registration with the remote service. Identity is `id`; every
/// other field is observed, never set locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub sub_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Minimal subscription carrying only an id, handy for placeholders and tests.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: String::new(),
            sub_type: String::new(),
            version: String::new(),
            cost: 0,
            condition: Condition::default(),
            transport: Transport::default(),
            created_at: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == status::ENABLED
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

/// `reward_id` is a string for custom rewards and a number for a few
/// automatic-reward types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RewardId {
    Text(String),
    Number(u64),
}

impl fmt::Display for RewardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardId::Text(s) => f.write_str(s),
            RewardId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RewardId {
    fn from(s: &str) -> Self {
        RewardId::Text(s.to_string())
    }
}

impl From<String> for RewardId {
    fn from(s: String) -> Self {
        RewardId::Text(s)
    }
}

impl From<u64> for RewardId {
    fn from(n: u64) -> Self {
        RewardId::Number(n)
    }
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// Sparse set of identifiers narrowing a subscription. Only the fields relevant
/// to a subscription type are populated; unset fields are omitted on the wire.
///
/// Equality compares populated fields only, and an empty string counts as unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub broadcaster_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub moderator_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub from_broadcaster_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub to_broadcaster_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_id: Option<RewardId>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub extension_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub conduit_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub campaign_id: Option<String>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the most common condition shape.
    pub fn broadcaster(id: impl Into<String>) -> Self {
        Self::default().with_broadcaster_user_id(id)
    }

    pub fn with_broadcaster_user_id(mut self, id: impl Into<String>) -> Self {
        self.broadcaster_user_id = Some(id.into());
        self
    }

    pub fn with_moderator_user_id(mut self, id: impl Into<String>) -> Self {
        self.moderator_user_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_from_broadcaster_user_id(mut self, id: impl Into<String>) -> Self {
        self.from_broadcaster_user_id = Some(id.into());
        self
    }

    pub fn with_to_broadcaster_user_id(mut self, id: impl Into<String>) -> Self {
        self.to_broadcaster_user_id = Some(id.into());
        self
    }

    pub fn with_reward_id(mut self, id: impl Into<RewardId>) -> Self {
        self.reward_id = Some(id.into());
        self
    }

    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn with_extension_client_id(mut self, id: impl Into<String>) -> Self {
        self.extension_client_id = Some(id.into());
        self
    }

    pub fn with_conduit_id(mut self, id: impl Into<String>) -> Self {
        self.conduit_id = Some(id.into());
        self
    }

    pub fn with_organization_id(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn with_category_id(mut self, id: impl Into<String>) -> Self {
        self.category_id = Some(id.into());
        self
    }

    pub fn with_campaign_id(mut self, id: impl Into<String>) -> Self {
        self.campaign_id = Some(id.into());
        self
    }

    /// Populated fields as `(wire name, value)` pairs in a fixed order.
    pub fn populated(&self) -> Vec<(&'static str, String)> {
        let text_fields = [
            ("broadcaster_user_id", &self.broadcaster_user_id),
            ("moderator_user_id", &self.moderator_user_id),
            ("user_id", &self.user_id),
            ("from_broadcaster_user_id", &self.from_broadcaster_user_id),
            ("to_broadcaster_user_id", &self.to_broadcaster_user_id),
            ("client_id", &self.client_id),
            ("extension_client_id", &self.extension_client_id),
            ("conduit_id", &self.conduit_id),
            ("organization_id", &self.organization_id),
            ("category_id", &self.category_id),
            ("campaign_id", &self.campaign_id),
        ];

        let mut out: Vec<(&'static str, String)> = text_fields
            .into_iter()
            .filter(|(_, v)| !is_unset(v))
            .filter_map(|(k, v)| v.clone().map(|v| (k, v)))
            .collect();

        match &self.reward_id {
            Some(RewardId::Text(s)) if s.is_empty() => {}
            Some(id) => out.push(("reward_id", id.to_string())),
            None => {}
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.populated().is_empty()
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.populated() == other.populated()
    }
}

impl Eq for Condition {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_fields_are_omitted_on_the_wire() {
        let cond = Condition::broadcaster("1337").with_moderator_user_id("42");
        let value = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            value,
            json!({ "broadcaster_user_id": "1337", "moderator_user_id": "42" })
        );

        // Empty strings count as absent too.
        let blank = Condition::broadcaster("1337").with_user_id("");
        assert_eq!(
            serde_json::to_value(&blank).unwrap(),
            json!({ "broadcaster_user_id": "1337" })
        );
    }

    #[test]
    fn equality_compares_populated_fields_only() {
        let from_remote: Condition = serde_json::from_value(json!({
            "broadcaster_user_id": "1337",
            "user_id": "",
        }))
        .unwrap();
        let local = Condition::broadcaster("1337");
        assert_eq!(from_remote, local);

        let with_mod = Condition::broadcaster("1337").with_moderator_user_id("1337");
        assert_ne!(local, with_mod);

        let other_field = Condition::new().with_user_id("1337");
        assert_ne!(local, other_field, "same value under a different field is not equal");
    }

    #[test]
    fn reward_id_accepts_strings_and_numbers() {
        let text: Condition =
            serde_json::from_value(json!({ "reward_id": "abc-123" })).unwrap();
        assert_eq!(text.reward_id, Some(RewardId::Text("abc-123".into())));

        let number: Condition = serde_json::from_value(json!({ "reward_id": 7 })).unwrap();
        assert_eq!(number.reward_id, Some(RewardId::Number(7)));
        assert_ne!(text, number);
    }

    #[test]
    fn subscription_tolerates_sparse_payloads() {
        let sub: Subscription = serde_json::from_value(json!({
            "id": "f1c2a387-161a-49f9-a165-0f21d7a4e1c4",
            "status": "webhook_callback_verification_pending",
            "type": "channel.follow",
            "version": "2",
            "cost": 1,
            "condition": { "broadcaster_user_id": "12826", "moderator_user_id": "12826" },
            "transport": { "method": "webhook", "callback": "https://example.com/webhooks/callback" },
            "created_at": "2019-11-16T10:11:12.634234626Z"
        }))
        .unwrap();
        assert_eq!(sub.sub_type, "channel.follow");
        assert_eq!(sub.status, status::VERIFICATION_PENDING);
        assert!(sub.created_at.is_some());
        assert!(!sub.is_enabled());

        let bare: Subscription = serde_json::from_value(json!({ "id": "sub-1" })).unwrap();
        assert_eq!(bare, Subscription::with_id("sub-1"));
    }
}
