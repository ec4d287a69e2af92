// Serializes the expensive lead listing query
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// Lets one unit of work run at a time; everyone else waits in arrival order.
///
/// Backed by a single-permit `tokio::sync::Semaphore`, whose waiter queue is
/// FIFO. The permit is released when the unit finishes, whether it returned
/// an error or unwound, so a failure never strands the callers behind it.
///
/// There is no timeout: a unit that never completes holds the gate.
#[derive(Debug)]
pub struct ListingGate {
    permit: Semaphore,
    waiting: AtomicUsize,
}

struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ListingGate {
    pub fn new() -> Self {
        Self {
            permit: Semaphore::new(1),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Runs `work` once the gate is free and hands its output back unchanged.
    pub async fn run<F, Fut, T>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = {
            let _waiting = self.enter_queue();
            if self.permit.available_permits() == 0 {
                tracing::debug!(waiting = self.waiting(), "listing gate busy, queued");
            }
            // The semaphore is never closed, so acquire only fails in theory.
            self.permit.acquire().await.ok()
        };
        work().await
    }

    fn enter_queue(&self) -> WaitingGuard<'_> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        WaitingGuard(&self.waiting)
    }

    /// Callers currently suspended behind the running unit.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> bool {
        self.permit.available_permits() == 0
    }
}

impl Default for ListingGate {
    fn default() -> Self {
        Self::new()
    }
}
