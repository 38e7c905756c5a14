//! Dispatch gate: concurrency limit plus global pacing between dispatches.

use crate::error::ProviderError;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Concurrency and pacing gate owned by one generation client.
///
/// A caller first waits for a free slot, then reserves the next dispatch
/// instant under the mutex (`max(now, last + min_interval)`), sleeps until it
/// and only then proceeds. Reservations are taken one at a time, so any two
/// dispatches are at least `min_interval` apart.
pub struct DispatchGate {
    slots: Semaphore,
    max_concurrent: usize,
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

/// Held for the duration of one provider call; dropping it frees the slot.
pub struct GatePermit<'a> {
    _slot: SemaphorePermit<'a>,
    pub dispatched_at: Instant,
}

impl DispatchGate {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            slots: Semaphore::new(max_concurrent),
            max_concurrent,
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> Result<GatePermit<'_>, ProviderError> {
        let slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| ProviderError::fatal("Dispatch gate closed"))?;

        let dispatch_at = self.reserve_dispatch();
        let now = Instant::now();
        if dispatch_at > now {
            debug!(
                wait_ms = (dispatch_at - now).as_millis() as u64,
                "Waiting out dispatch interval"
            );
            sleep_until(dispatch_at).await;
        }

        Ok(GatePermit {
            _slot: slot,
            dispatched_at: dispatch_at,
        })
    }

    fn reserve_dispatch(&self) -> Instant {
        let now = Instant::now();
        let mut last = self.last_dispatch.lock();
        let next = match *last {
            Some(previous) => now.max(previous + self.min_interval),
            None => now,
        };
        *last = Some(next);
        next
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }
}
