//! Shared per-crawl counters
//!
//! All counters live behind one `parking_lot::Mutex` so every read-modify-write
//! is atomic with respect to the others. Every change is broadcast through a
//! `tokio::sync::Notify`, which the dispatch loop waits on for backpressure.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use super::crawl_types::TerminationReason;

#[derive(Debug, Default)]
struct Counters {
    accepted: usize,
    reserved: usize,
    in_flight: usize,
    terminated: Option<TerminationReason>,
}

/// Result of waiting for a free worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// A worker may be started
    Available,
    /// Crawl is terminated or the quota is used up; start nothing
    Exhausted,
}

/// Shared state of one crawl invocation
#[derive(Debug)]
pub struct CrawlState {
    depth: usize,
    counters: Mutex<Counters>,
    changed: Notify,
}

impl CrawlState {
    #[must_use]
    pub fn new(depth: usize) -> Arc<Self> {
        Arc::new(Self {
            depth,
            counters: Mutex::new(Counters::default()),
            changed: Notify::new(),
        })
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn accepted(&self) -> usize {
        self.counters.lock().accepted
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.counters.lock().in_flight
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.counters.lock().terminated.is_some()
    }

    #[must_use]
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.counters.lock().terminated
    }

    /// Set the terminated flag. The first reason wins; later calls are ignored.
    pub fn terminate(&self, reason: TerminationReason) {
        {
            let mut c = self.counters.lock();
            if c.terminated.is_none() {
                c.terminated = Some(reason);
            }
        }
        self.changed.notify_waiters();
    }

    /// Quota not yet accepted or reserved
    #[must_use]
    pub fn remaining(&self) -> usize {
        let c = self.counters.lock();
        self.depth.saturating_sub(c.accepted + c.reserved)
    }

    /// Claim the right to persist one image
    ///
    /// Refused once terminated or when accepted plus outstanding reservations
    /// already cover the depth target.
    #[must_use]
    pub fn try_reserve(self: &Arc<Self>) -> Option<QuotaSlot> {
        let mut c = self.counters.lock();
        if c.terminated.is_some() || c.accepted + c.reserved >= self.depth {
            return None;
        }
        c.reserved += 1;
        Some(QuotaSlot {
            state: Arc::clone(self),
            committed: false,
        })
    }

    /// Register a dispatched worker; the returned guard unregisters it on drop
    #[must_use]
    pub fn start_worker(self: &Arc<Self>) -> InFlightGuard {
        self.counters.lock().in_flight += 1;
        self.changed.notify_waiters();
        InFlightGuard {
            state: Arc::clone(self),
        }
    }

    fn capacity_now(&self) -> Option<Capacity> {
        let c = self.counters.lock();
        if c.terminated.is_some() {
            return Some(Capacity::Exhausted);
        }
        let remaining = self.depth.saturating_sub(c.accepted);
        if remaining == 0 {
            return Some(Capacity::Exhausted);
        }
        if c.in_flight < remaining {
            return Some(Capacity::Available);
        }
        None
    }

    /// Wait until fewer workers are in flight than images still needed
    ///
    /// Wakes on every state change and re-checks at least every `poll`.
    pub async fn wait_for_capacity(&self, poll: Duration) -> Capacity {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(capacity) = self.capacity_now() {
                return capacity;
            }

            let _ = tokio::time::timeout(poll, notified).await;
        }
    }
}

/// Reserved right to persist one image
///
/// Dropping an uncommitted slot gives the quota back.
#[derive(Debug)]
pub struct QuotaSlot {
    state: Arc<CrawlState>,
    committed: bool,
}

impl QuotaSlot {
    /// Count the reserved image as accepted
    ///
    /// Terminates the crawl with [`TerminationReason::QuotaReached`] once the
    /// depth target is met. Returns the new accepted count.
    pub fn commit(mut self) -> usize {
        self.committed = true;
        let accepted = {
            let mut c = self.state.counters.lock();
            c.reserved -= 1;
            c.accepted += 1;
            if c.accepted >= self.state.depth && c.terminated.is_none() {
                c.terminated = Some(TerminationReason::QuotaReached);
            }
            c.accepted
        };
        self.state.changed.notify_waiters();
        accepted
    }
}

impl Drop for QuotaSlot {
    fn drop(&mut self) {
        if !self.committed {
            self.state.counters.lock().reserved -= 1;
            self.state.changed.notify_waiters();
        }
    }
}

/// Decrements `in_flight` when a worker finishes, is aborted or panics
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<CrawlState>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        {
            let mut c = self.state.counters.lock();
            c.in_flight = c.in_flight.saturating_sub(1);
        }
        self.state.changed.notify_waiters();
    }
}
