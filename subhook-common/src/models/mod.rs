pub mod message;
pub mod subscription;

pub use message::{headers, InboundMessage, MessageKind, WebhookPayload};
pub use subscription::{status, Condition, RewardId, Subscription, Transport};
