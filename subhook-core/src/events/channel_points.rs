use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// "channel.channel_points_custom_reward_redemption.add"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPointsRedemption {
    pub id: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub user_input: String,
    /// "unfulfilled", "fulfilled" or "canceled".
    pub status: String,
    pub reward: RedeemedReward,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemedReward {
    pub id: String,
    pub title: String,
    pub cost: u64,
    #[serde(default)]
    pub prompt: String,
}
