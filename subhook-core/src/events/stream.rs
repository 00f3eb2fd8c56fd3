use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// "stream.online"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOnline {
    pub id: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    /// "live", "playlist", "watch_party", "premiere" or "rerun".
    #[serde(rename = "type", default)]
    pub stream_type: String,
    pub started_at: DateTime<Utc>,
}

/// "stream.offline"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOffline {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
}
