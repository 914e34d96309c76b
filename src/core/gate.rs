//! Admission gate: a pacing ticker combined with a pool of concurrency tokens.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Interval, MissedTickBehavior};

use super::RequestContext;

/// Grants dispatch permits: one pacing tick, then one concurrency token.
///
/// Tokens are [`OwnedSemaphorePermit`]s, so a token goes back to the pool
/// exactly once, when the permit is dropped, whatever path the holder exits
/// through.
pub struct AdmissionGate {
    ticker: Interval,
    tokens: Arc<Semaphore>,
}

impl AdmissionGate {
    /// Build a gate with a pre-filled pool of `concurrency` tokens.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(pacing: Duration, concurrency: usize) -> Self {
        Self::with_tokens(pacing, Arc::new(Semaphore::new(concurrency)))
    }

    /// Build a gate over an existing token pool.
    pub fn with_tokens(pacing: Duration, tokens: Arc<Semaphore>) -> Self {
        let mut ticker = tokio::time::interval(pacing);
        // At most one pending tick, like a ticker whose channel holds one value.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker, tokens }
    }

    /// Shared handle to the token pool.
    pub fn tokens(&self) -> Arc<Semaphore> {
        Arc::clone(&self.tokens)
    }

    /// Wait for the next pacing tick and then for a free token.
    ///
    /// Returns `None` once `root` is cancelled or past its deadline; from then
    /// on the gate is closed and grants nothing further.
    pub async fn admit(&mut self, root: &RequestContext) -> Option<OwnedSemaphorePermit> {
        if root.is_done() {
            self.tokens.close();
            return None;
        }

        tokio::select! {
            biased;
            _ = root.done() => {
                self.tokens.close();
                return None;
            }
            _ = self.ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = root.done() => {
                self.tokens.close();
                None
            }
            permit = Arc::clone(&self.tokens).acquire_owned() => permit.ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_tokens_bound_admissions() {
        let root = RequestContext::new();
        let mut gate = AdmissionGate::new(Duration::from_nanos(1), 2);

        let first = gate.admit(&root).await;
        let second = gate.admit(&root).await;
        assert!(first.is_some() && second.is_some());
        assert_eq!(gate.tokens().available_permits(), 0);

        let blocked =
            tokio::time::timeout(Duration::from_millis(30), gate.admit(&root)).await;
        assert!(blocked.is_err(), "third admission must wait for a token");

        drop(first);
        let third = gate.admit(&root).await;
        assert!(third.is_some());
    }

    #[tokio::test]
    async fn test_pacing_spaces_admissions() {
        let root = RequestContext::new();
        let mut gate = AdmissionGate::new(Duration::from_millis(25), 8);

        let start = Instant::now();
        let mut permits = Vec::new();
        for _ in 0..3 {
            permits.push(gate.admit(&root).await);
        }
        // The first tick is immediate; the next two are paced.
        assert!(start.elapsed() >= Duration::from_millis(45));
        assert!(permits.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn test_cancellation_closes_gate() {
        let root = RequestContext::new();
        let mut gate = AdmissionGate::new(Duration::from_nanos(1), 1);
        let held = gate.admit(&root).await;
        assert!(held.is_some());

        let waiter = {
            let root = root.clone();
            tokio::spawn(async move { gate.admit(&root).await.is_none() })
        };
        root.cancel();
        assert!(waiter.await.unwrap_or(false));
    }

    #[tokio::test]
    async fn test_root_deadline_wakes_parked_gate() {
        let root = RequestContext::new().with_timeout(Duration::from_millis(40));
        let mut gate = AdmissionGate::new(Duration::from_secs(3_600), 4);
        assert!(gate.admit(&root).await.is_some());

        // Parked on the next tick, an hour away.
        let start = Instant::now();
        assert!(gate.admit(&root).await.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));

        // Parked on an exhausted pool.
        let root = RequestContext::new().with_timeout(Duration::from_millis(40));
        let mut gate = AdmissionGate::new(Duration::from_nanos(1), 1);
        let _held = gate.admit(&root).await;
        let start = Instant::now();
        assert!(gate.admit(&root).await.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
