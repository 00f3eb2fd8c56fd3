// File: subhook-core/src/handshake.rs
//
// Joins an outbound create-subscription call with the inbound verification
// callback that confirms it. Each waiter is keyed by subscription id and
// signalled directly, so concurrent subscribes never see each other's ids.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::models::Subscription;
use crate::Error;

/// Reference deadline for a verification callback.
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Registry {
    waiters: HashMap<String, oneshot::Sender<()>>,
    /// Confirmations that arrived before anyone registered for them. The remote
    /// service may call back before our create request has even returned.
    parked: HashMap<String, Instant>,
}

impl Registry {
    fn sweep(&mut self, now: Instant, keep: Duration) {
        self.waiters.retain(|_, tx| !tx.is_closed());
        self.parked
            .retain(|_, arrived| now.saturating_duration_since(*arrived) <= keep);
    }
}

/// A subscribe call waiting for its verification callback.
pub struct PendingVerification {
    subscription: Subscription,
    rx: oneshot::Receiver<()>,
    created_at: Instant,
}

impl PendingVerification {
    pub fn subscription_id(&self) -> &str {
        &self.subscription.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

pub struct VerificationHandshake {
    registry: Mutex<Registry>,
    timeout: Duration,
}

impl VerificationHandshake {
    pub fn new(timeout: Duration) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers interest in the verification of `subscription`.
    pub fn register(&self, subscription: Subscription) -> PendingVerification {
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let mut registry = self.registry.lock();
        registry.sweep(now, self.timeout);

        if registry.parked.remove(&subscription.id).is_some() {
            debug!("[EventSub] verification for {} arrived early", subscription.id);
            let _ = tx.send(());
        } else if registry.waiters.insert(subscription.id.clone(), tx).is_some() {
            warn!("[EventSub] replaced an existing waiter for {}", subscription.id);
        }

        PendingVerification {
            subscription,
            rx,
            created_at: now,
        }
    }

    /// Called by the endpoint for an authenticated verification request.
    /// Returns true if a waiting subscribe call was released.
    pub fn confirm(&self, subscription_id: &str) -> bool {
        let now = Instant::now();
        let mut registry = self.registry.lock();
        registry.sweep(now, self.timeout);

        match registry.waiters.remove(subscription_id) {
            Some(tx) => tx.send(()).is_ok(),
            None => {
                registry.parked.insert(subscription_id.to_string(), now);
                false
            }
        }
    }

    /// Blocks until the verification arrives or the deadline passes. The
    /// deadline is fixed at registration time.
    pub async fn wait(&self, pending: PendingVerification) -> Result<Subscription, Error> {
        let PendingVerification {
            subscription,
            rx,
            created_at,
        } = pending;

        match timeout_at(created_at + self.timeout, rx).await {
            Ok(Ok(())) => {
                debug!("[EventSub] subscription verified: {}", subscription.id);
                Ok(subscription)
            }
            _ => {
                self.abandon(&subscription.id);
                warn!("[EventSub] never received confirmation of subscription: {}", subscription.id);
                Err(Error::VerificationTimeout {
                    subscription: Box::new(subscription),
                })
            }
        }
    }

    fn abandon(&self, subscription_id: &str) {
        let mut registry = self.registry.lock();
        if registry
            .waiters
            .get(subscription_id)
            .is_some_and(|tx| tx.is_closed())
        {
            registry.waiters.remove(subscription_id);
        }
    }

    /// Number of subscribe calls currently waiting.
    pub fn pending(&self) -> usize {
        self.registry
            .lock()
            .waiters
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl Default for VerificationHandshake {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFICATION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn confirmation_releases_waiter() {
        let handshake = Arc::new(VerificationHandshake::default());
        let pending = handshake.register(Subscription::with_id("sub-1"));
        assert_eq!(handshake.pending(), 1);

        let confirmer = Arc::clone(&handshake);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(confirmer.confirm("sub-1"));
        });

        let sub = handshake.wait(pending).await.unwrap();
        assert_eq!(sub.id, "sub-1");
        assert_eq!(handshake.pending(), 0);
    }

    #[tokio::test]
    async fn confirmation_before_registration_is_kept() {
        let handshake = VerificationHandshake::default();
        assert!(!handshake.confirm("early"));

        let pending = handshake.register(Subscription::with_id("early"));
        let sub = handshake.wait(pending).await.unwrap();
        assert_eq!(sub.id, "early");
    }

    #[tokio::test(start_paused = true)]
    async fn other_ids_do_not_release_a_waiter() {
        let handshake = VerificationHandshake::default();
        let a = handshake.register(Subscription::with_id("a"));
        let b = handshake.register(Subscription::with_id("b"));

        assert!(handshake.confirm("a"));
        assert_eq!(handshake.wait(a).await.unwrap().id, "a");

        let err = handshake.wait(b).await.unwrap_err();
        match err {
            Error::VerificationTimeout { subscription } => assert_eq!(subscription.id, "b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_measured_from_registration() {
        let handshake = VerificationHandshake::new(Duration::from_secs(10));
        let pending = handshake.register(Subscription::with_id("slow"));

        tokio::time::advance(Duration::from_secs(6)).await;
        let started = Instant::now();
        assert!(handshake.wait(pending).await.is_err());
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(4) && waited < Duration::from_secs(5));

        assert_eq!(handshake.pending(), 0);
        assert!(!handshake.confirm("slow"), "late verification is dropped");
    }

    #[tokio::test]
    async fn concurrent_subscribes_each_get_their_own_confirmation() {
        let handshake = Arc::new(VerificationHandshake::default());
        let ids: Vec<String> = (0..16).map(|i| format!("sub-{i}")).collect();

        let mut waiters = Vec::new();
        for id in &ids {
            let pending = handshake.register(Subscription::with_id(id.clone()));
            let handshake = Arc::clone(&handshake);
            let expected = id.clone();
            waiters.push(tokio::spawn(async move {
                let sub = handshake.wait(pending).await.unwrap();
                assert_eq!(sub.id, expected);
                sub.id
            }));
        }

        // Confirm out of issuance order.
        for id in ids.iter().rev() {
            let handshake = Arc::clone(&handshake);
            let id = id.clone();
            tokio::spawn(async move { handshake.confirm(&id) });
        }

        let mut verified = Vec::new();
        for w in waiters {
            verified.push(w.await.unwrap());
        }
        verified.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(verified, expected);
    }
}
