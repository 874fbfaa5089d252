//! Global LLM admission control.
//!
//! One bounded semaphore shared by every in-flight agent call across all
//! MRs, plus a shared pause gate: a `RateLimited` response from any vendor
//! pauses new admissions for `rate_limit_wait` before the next permit is
//! handed out, rather than letting every concurrent caller hammer the vendor
//! at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::sync::RwLock;
use tokio::time::Instant;

pub struct AdmissionGate {
    semaphore: Semaphore,
    paused_until: RwLock<Option<Instant>>,
}

impl AdmissionGate {
    pub fn new(max_concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Semaphore::new(max_concurrency.max(1)),
            paused_until: RwLock::new(None),
        })
    }

    /// Waits out any active rate-limit pause, then acquires a permit.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        loop {
            let until = *self.paused_until.read().await;
            match until {
                Some(when) if when > Instant::now() => {
                    tokio::time::sleep_until(when).await;
                }
                _ => break,
            }
        }
        self.semaphore
            .acquire()
            .await
            .expect("semaphore is never closed")
    }

    /// Non-blocking capacity probe, used at the edge (webhook intake) to
    /// reject new work with a 429 rather than queueing it behind whatever is
    /// already running. Does not hold the permit: a `true` result is a
    /// snapshot, not a reservation.
    pub fn has_capacity(&self) -> bool {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                drop(permit);
                true
            }
            Err(_) => false,
        }
    }

    /// Called after a `RateLimited` response; pauses subsequent admissions.
    pub async fn pause_for(&self, duration: Duration) {
        let mut guard = self.paused_until.write().await;
        let candidate = Instant::now() + duration;
        if guard.is_none_or(|current| candidate > current) {
            *guard = Some(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_succeeds_without_a_pause() {
        let gate = AdmissionGate::new(2);
        let _permit = gate.acquire().await;
    }

    #[tokio::test]
    async fn has_capacity_is_false_once_every_permit_is_held() {
        let gate = AdmissionGate::new(1);
        assert!(gate.has_capacity());
        let _permit = gate.acquire().await;
        assert!(!gate.has_capacity());
    }

    #[tokio::test]
    async fn pause_extends_only_forward() {
        let gate = AdmissionGate::new(1);
        gate.pause_for(Duration::from_millis(50)).await;
        let first = gate.paused_until.read().await.unwrap();
        gate.pause_for(Duration::from_millis(1)).await;
        let second = gate.paused_until.read().await.unwrap();
        assert_eq!(first, second);
    }
}
