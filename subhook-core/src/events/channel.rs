use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// "channel.update" (v2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub title: String,
    pub language: String,
    pub category_id: String,
    pub category_name: String,
    #[serde(default)]
    pub content_classification_labels: Vec<String>,
}

/// "channel.follow" (v2, needs a moderator condition)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelFollow {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub followed_at: DateTime<Utc>,
}

/// "channel.raid"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRaid {
    pub from_broadcaster_user_id: String,
    pub from_broadcaster_user_login: String,
    pub from_broadcaster_user_name: String,
    pub to_broadcaster_user_id: String,
    pub to_broadcaster_user_login: String,
    pub to_broadcaster_user_name: String,
    pub viewers: u64,
}
