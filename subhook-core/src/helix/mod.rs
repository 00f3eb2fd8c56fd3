// File: subhook-core/src/helix/mod.rs

pub mod client;
pub mod requests;

pub use client::{HelixClient, DEFAULT_HELIX_URL};
pub use requests::subscriptions::SubscriptionFilter;
