// File: subhook-core/src/auth/mod.rs

pub mod credentials;
pub mod identity;

pub use credentials::{
    CredentialManager, CredentialState, RefreshHandle, RefreshOutcome, DEFAULT_REFRESH_INTERVAL,
};
pub use identity::{AccessToken, AppToken, IdentityApi, TwitchIdentityClient, DEFAULT_OAUTH_URL};
