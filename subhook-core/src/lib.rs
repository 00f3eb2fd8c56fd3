// src/lib.rs

pub mod auth;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod events;
pub mod handshake;
pub mod helix;
pub mod ledger;
pub mod signature;

pub use subhook_common::error::{Error, ErrorKind};
pub use subhook_common::models;

pub use client::EventSubClient;
pub use config::ClientConfig;
pub use dispatcher::{DecodeFailure, EventDispatcher, EventHandler};
pub use endpoint::WebhookState;
pub use events::EventSubEvent;
