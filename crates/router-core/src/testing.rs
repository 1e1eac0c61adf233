//! Test-only `Consumer` implementation shared by this crate's tests and by
//! downstream integration tests (gated behind the `test-utils` feature).

use crate::Consumer;
use parking_lot::Mutex;
use router_types::{RouterError, RowBatchPayload};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Records everything the router delivers to it, for assertion in tests.
#[derive(Default)]
pub struct MockConsumer {
    batches: Mutex<Vec<RowBatchPayload>>,
    initiated: AtomicBool,
    closed: AtomicBool,
}

impl MockConsumer {
    /// Builds an empty mock consumer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches delivered so far, in delivery order.
    #[must_use]
    pub fn batches(&self) -> Vec<RowBatchPayload> {
        self.batches.lock().clone()
    }

    /// Whether `notify_upstream_initiated` has been called.
    #[must_use]
    pub fn initiated(&self) -> bool {
        self.initiated.load(Ordering::SeqCst)
    }

    /// Whether `notify_upstream_closed` has been called.
    #[must_use]
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Consumer for MockConsumer {
    fn enqueue_row_batch(&self, batch: RowBatchPayload) -> Result<(), RouterError> {
        self.batches.lock().push(batch);
        Ok(())
    }

    fn notify_upstream_initiated(&self) {
        self.initiated.store(true, Ordering::SeqCst);
    }

    fn notify_upstream_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A wake callback that counts invocations.
#[derive(Default)]
pub struct WakeCounter {
    count: AtomicUsize,
}

impl WakeCounter {
    /// Builds a fresh counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of times the associated [`crate::WakeFn`] has fired.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Builds a [`crate::WakeFn`] that increments this counter, wrapped in
    /// an `Arc` so it can be shared with the registry and inspected after.
    #[must_use]
    pub fn into_wake_fn(self: &std::sync::Arc<Self>) -> crate::WakeFn {
        let this = std::sync::Arc::clone(self);
        crate::wake_fn(move || {
            let _ = this.count.fetch_add(1, Ordering::SeqCst);
        })
    }
}
