use crate::consumer::{ConsumerHandle, WakeFn};
use router_types::RowBatchPayload;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

/// Per-`(query_id, source_id)` rendezvous state.
///
/// A slot starts *buffering* (no consumer yet) and may transition once to
/// *attached* when a consumer registers. The reverse transition never
/// happens: once attached, a slot stays attached until the owning query is
/// deleted. All mutation happens while the caller holds the owning query's
/// lock, so the sequencing invariants in the module doc are just "do these
/// steps in this order" rather than anything requiring its own lock.
#[derive(Default)]
pub(crate) struct ConsumerSlot {
    attached: Option<Attached>,
    pending: VecDeque<RowBatchPayload>,
    initiated: bool,
    closed: bool,
}

struct Attached {
    consumer: ConsumerHandle,
    wake: WakeFn,
}

/// Outcome of registering a consumer on a slot that may already carry
/// producer state. Delivery and notification replay have already happened
/// by the time this is returned; the fields are for the caller's logging.
pub(crate) struct AttachOutcome {
    /// Number of batches that were sitting in `pending` and have now been
    /// delivered to the consumer, in arrival order, each followed by a wake.
    pub(crate) drained: usize,
    /// Whether the producer had already sent `StreamInit` before this
    /// consumer attached (and `notify_upstream_initiated` was replayed).
    pub(crate) was_initiated: bool,
    /// Whether the producer had already closed before this consumer attached
    /// (and `notify_upstream_closed` was replayed).
    pub(crate) was_closed: bool,
}

/// Outcome of registering a consumer against an already-attached slot.
pub(crate) enum AttachResult {
    /// First registration, or idempotent re-registration with the same
    /// consumer identity.
    Attached(AttachOutcome),
    /// A different consumer is already attached to this slot.
    Conflict,
}

impl ConsumerSlot {
    /// Attempts to attach `consumer`/`wake` to this slot.
    ///
    /// Drain-under-lock invariant: `initiated` is replayed first (if already
    /// observed), then `pending` is drained FIFO into the consumer with one
    /// wake per batch, then `closed` is replayed (if already observed).
    /// Because the caller holds the query lock for the whole call, no batch
    /// can be both left on `pending` and delivered, and no producer can
    /// observe a half-attached state.
    pub(crate) fn attach(&mut self, consumer: Arc<dyn crate::Consumer>, wake: WakeFn) -> AttachResult {
        if let Some(existing) = &self.attached {
            return if existing.consumer.same_consumer(&consumer) {
                // Idempotent re-registration: nothing left to drain, the
                // first registration already drained everything there was.
                AttachResult::Attached(AttachOutcome {
                    drained: 0,
                    was_initiated: self.initiated,
                    was_closed: self.closed,
                })
            } else {
                AttachResult::Conflict
            };
        }

        if self.initiated {
            consumer.notify_upstream_initiated();
        }

        let mut drained = 0;
        while let Some(batch) = self.pending.pop_front() {
            if let Err(err) = consumer.enqueue_row_batch(batch) {
                warn!(error = %err, "consumer rejected row batch delivery");
                continue;
            }
            wake();
            drained += 1;
        }

        if self.closed {
            consumer.notify_upstream_closed();
        }

        self.attached = Some(Attached {
            consumer: ConsumerHandle(consumer),
            wake,
        });

        AttachResult::Attached(AttachOutcome {
            drained,
            was_initiated: self.initiated,
            was_closed: self.closed,
        })
    }

    /// Routes one producer batch to this slot: delivered immediately if
    /// attached, otherwise appended to `pending`.
    pub(crate) fn route(&mut self, batch: RowBatchPayload) {
        match &self.attached {
            Some(attached) => {
                if let Err(err) = attached.consumer.0.enqueue_row_batch(batch) {
                    warn!(error = %err, "consumer rejected row batch delivery");
                    return;
                }
                (attached.wake)();
            }
            None => self.pending.push_back(batch),
        }
    }

    /// Marks the producer-initiated transition. Returns `false` if this
    /// source was already initiated (duplicate `StreamInit`).
    pub(crate) fn mark_initiated(&mut self) -> bool {
        if self.initiated {
            return false;
        }
        self.initiated = true;
        if let Some(attached) = &self.attached {
            attached.consumer.0.notify_upstream_initiated();
        }
        true
    }

    /// Marks the producer-closed transition. Idempotent: a second call is a
    /// silent no-op, matching `upstream_closed` transitioning at most once.
    pub(crate) fn mark_closed(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(attached) = &self.attached {
            attached.consumer.0.notify_upstream_closed();
        }
    }

    /// Drops consumer and pending state as part of query deletion. No
    /// further wakes will fire for this slot after this call returns.
    pub(crate) fn clear(&mut self) {
        self.attached = None;
        self.pending.clear();
    }

    #[cfg(test)]
    pub(crate) fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
