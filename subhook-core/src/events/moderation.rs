use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// "channel.ban". Timeouts arrive as bans with `is_permanent = false` and an `ends_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelBan {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub moderator_user_id: String,
    pub moderator_user_login: String,
    pub moderator_user_name: String,
    #[serde(default)]
    pub reason: String,
    pub banned_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub is_permanent: bool,
}

/// "channel.unban"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUnban {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub moderator_user_id: String,
    pub moderator_user_login: String,
    pub moderator_user_name: String,
}
