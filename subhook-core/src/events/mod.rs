// File: subhook-core/src/events/mod.rs
//
// Event body shapes. Each shape knows the subscription type and version it
// arrives under, so handlers can be registered by shape alone.

pub mod channel;
pub mod channel_points;
pub mod moderation;
pub mod stream;
pub mod support;

pub use channel::*;
pub use channel_points::*;
pub use moderation::*;
pub use stream::*;
pub use support::*;

use serde::de::DeserializeOwned;

/// A decodable event body for one subscription type.
pub trait EventSubEvent: DeserializeOwned + Send + 'static {
    /// Subscription type name, e.g. `"stream.online"`.
    const TYPE: &'static str;
    /// Subscription version this shape matches.
    const VERSION: &'static str;
}

macro_rules! eventsub_event {
    ($($shape:ty => $sub_type:literal, $version:literal;)*) => {
        $(
            impl EventSubEvent for $shape {
                const TYPE: &'static str = $sub_type;
                const VERSION: &'static str = $version;
            }
        )*

        /// `(type, version)` of every shape in this module.
        pub const KNOWN_TYPES: &[(&str, &str)] = &[$(($sub_type, $version)),*];
    };
}

eventsub_event! {
    StreamOnline => "stream.online", "1";
    StreamOffline => "stream.offline", "1";
    ChannelUpdate => "channel.update", "2";
    ChannelFollow => "channel.follow", "2";
    ChannelRaid => "channel.raid", "1";
    ChannelBan => "channel.ban", "1";
    ChannelUnban => "channel.unban", "1";
    ChannelCheer => "channel.cheer", "1";
    ChannelSubscribe => "channel.subscribe", "1";
    ChannelPointsRedemption => "channel.channel_points_custom_reward_redemption.add", "1";
}

/// Version this module decodes for `sub_type`, if it has a shape for it.
pub fn known_version(sub_type: &str) -> Option<&'static str> {
    KNOWN_TYPES
        .iter()
        .find(|(name, _)| *name == sub_type)
        .map(|(_, version)| *version)
}
