// Viewer support: bits and subscriptions.

use serde::{Deserialize, Serialize};

/// "channel.cheer". User fields are null for anonymous cheers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCheer {
    pub is_anonymous: bool,
    pub user_id: Option<String>,
    pub user_login: Option<String>,
    pub user_name: Option<String>,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub message: String,
    pub bits: u64,
}

/// "channel.subscribe"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSubscribe {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    /// "1000", "2000" or "3000".
    pub tier: String,
    pub is_gift: bool,
}
