use router_types::RouterError;
use std::fmt;
use std::sync::Arc;

/// The capability set the router requires from a local consumer node.
///
/// A consumer is registered once via [`crate::ConsumerRegistry::add_grpc_source_node`]
/// and may be called from any thread afterwards; implementations must be
/// internally synchronized. The router never blocks waiting on a consumer
/// call: all three methods are expected to return promptly, posting any
/// further work to the consumer's own executor.
pub trait Consumer: Send + Sync {
    /// Hands a decoded row batch to the consumer.
    ///
    /// Called from whichever thread is routing the batch (producer stream
    /// handler, or the registering thread draining a buffered backlog). The
    /// router does not retry on failure: a returned error is logged by the
    /// caller and the batch is considered delivered as far as the registry
    /// is concerned (the router's contract is delivery, not acknowledgment).
    fn enqueue_row_batch(&self, batch: router_types::RowBatchPayload) -> Result<(), RouterError>;

    /// Notifies the consumer that its upstream producer has sent
    /// `StreamInit`.
    fn notify_upstream_initiated(&self);

    /// Notifies the consumer that its upstream producer stream has ended,
    /// whether by clean half-close or by transport error.
    fn notify_upstream_closed(&self);
}

/// A non-blocking, panic-free callback invoked once per batch made
/// available to a consumer.
///
/// Expressed as a narrow `Fn` rather than tied to any particular executor:
/// the router's only requirement is that invoking it does not block and
/// does not unwind.
pub type WakeFn = Arc<dyn Fn() + Send + Sync>;

/// Wraps a plain closure as a [`WakeFn`].
#[must_use]
pub fn wake_fn<F>(f: F) -> WakeFn
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An opaque handle identifying a registered consumer for reference-equality
/// comparisons.
///
/// The registry never dereferences a consumer it did not register; it only
/// ever compares two handles for identity (`Arc::ptr_eq`) to decide whether a
/// re-registration is the idempotent no-op case or a conflicting one.
#[derive(Clone)]
pub(crate) struct ConsumerHandle(pub(crate) Arc<dyn Consumer>);

impl ConsumerHandle {
    pub(crate) fn same_consumer(&self, other: &Arc<dyn Consumer>) -> bool {
        Arc::ptr_eq(&self.0, other)
    }
}

impl fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsumerHandle({:p})", Arc::as_ptr(&self.0))
    }
}
