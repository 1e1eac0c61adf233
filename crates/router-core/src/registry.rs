use crate::consumer::{Consumer, WakeFn};
use crate::slot::{AttachResult, ConsumerSlot};
use parking_lot::Mutex;
use router_types::{AgentExecutionStats, AgentId, QueryId, RouterError, RowBatchPayload, SourceId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// Upper bound on how many deleted query ids the registry remembers so a
/// stray late message cannot resurrect a torn-down query.
///
/// `QueryId`s are effectively random 128-bit values minted once per query;
/// in practice a query is never revisited once deleted, so a bounded FIFO of
/// recently deleted ids is enough to close the unknown-vs-deleted race
/// without growing without bound over the life of the process.
const DEFAULT_TOMBSTONE_CAPACITY: usize = 4096;

/// Owns the source-id map, the per-agent stats list, and the deletion flag
/// for one query.
///
/// Created lazily on first reference — whether that reference is a producer
/// chunk or a consumer registration — and destroyed only by
/// [`ConsumerRegistry::delete_query`].
struct QueryEntry {
    inner: Mutex<QueryEntryInner>,
}

struct QueryEntryInner {
    sources: HashMap<SourceId, ConsumerSlot>,
    stats: Vec<AgentExecutionStats>,
    deleted: bool,
}

impl QueryEntry {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(QueryEntryInner {
                sources: HashMap::new(),
                stats: Vec::new(),
                deleted: false,
            }),
        })
    }
}

/// Bounded, FIFO-evicted record of recently deleted queries.
///
/// Without this, a chunk that arrives after `DeleteQuery` has already erased
/// the entry would look identical to a chunk for a query nobody has ever
/// referenced, and the registry would silently resurrect it.
struct Tombstones {
    capacity: usize,
    order: VecDeque<QueryId>,
    set: HashSet<QueryId>,
}

impl Tombstones {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            set: HashSet::new(),
        }
    }

    fn record(&mut self, query_id: QueryId) {
        if !self.set.insert(query_id) {
            return;
        }
        self.order.push_back(query_id);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                let _ = self.set.remove(&evicted);
            }
        }
    }

    fn contains(&self, query_id: &QueryId) -> bool {
        self.set.contains(query_id)
    }
}

/// The consumer registry: a shared mapping from `query_id` to per-query state,
/// exposed through the router's local interface.
///
/// Two lock levels guard this structure: a registry-level lock protecting
/// only the `query_id -> QueryEntry` map (held for lookup/insert/erase), and
/// a per-query lock protecting that query's source map, slots,
/// stats, and deletion flag. Locks are always acquired registry-first, then
/// per-query, never the reverse, and neither is ever held across an
/// unbounded wait — only across the wake callback, which is documented to be
/// non-blocking.
pub struct ConsumerRegistry {
    queries: Mutex<HashMap<QueryId, Arc<QueryEntry>>>,
    tombstones: Mutex<Tombstones>,
}

impl Default for ConsumerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(HashMap::new()),
            tombstones: Mutex::new(Tombstones::new(DEFAULT_TOMBSTONE_CAPACITY)),
        }
    }

    /// Looks up the entry for `query_id`, creating it if this is the first
    /// reference and the query was never torn down. Returns `None` if the
    /// query has already been deleted.
    fn entry_for(&self, query_id: QueryId) -> Option<Arc<QueryEntry>> {
        if self.tombstones.lock().contains(&query_id) {
            return None;
        }
        let mut queries = self.queries.lock();
        Some(Arc::clone(
            queries.entry(query_id).or_insert_with(QueryEntry::new),
        ))
    }

    /// Looks up an existing entry without creating one.
    fn existing_entry(&self, query_id: QueryId) -> Option<Arc<QueryEntry>> {
        self.queries.lock().get(&query_id).map(Arc::clone)
    }

    /// Registers a local consumer node for `(query_id, source_id)`.
    ///
    /// Idempotent when called twice with the same `consumer` pointer.
    /// Conflicts with a different pointer return
    /// [`RouterError::AlreadyRegistered`]. If the slot already has batches
    /// queued from an earlier-arriving producer, they are delivered into the
    /// consumer — with one wake per batch — before this call returns, and any
    /// `StreamInit`/close transitions already observed are replayed onto the
    /// consumer as well, all while still holding the per-query lock.
    pub fn add_grpc_source_node(
        &self,
        query_id: QueryId,
        source_id: SourceId,
        consumer: Arc<dyn Consumer>,
        wake_fn: WakeFn,
    ) -> Result<(), RouterError> {
        let entry = self
            .entry_for(query_id)
            .ok_or(RouterError::QueryDeleted { query_id })?;

        let outcome = {
            let mut inner = entry.inner.lock();
            if inner.deleted {
                return Err(RouterError::QueryDeleted { query_id });
            }
            let slot = inner.sources.entry(source_id).or_default();
            match slot.attach(consumer, wake_fn) {
                AttachResult::Attached(outcome) => outcome,
                AttachResult::Conflict => {
                    return Err(RouterError::AlreadyRegistered {
                        query_id,
                        source_id,
                    });
                }
            }
        };

        trace!(
            %query_id,
            %source_id,
            drained = outcome.drained,
            initiated = outcome.was_initiated,
            closed = outcome.was_closed,
            "consumer attached"
        );

        Ok(())
    }

    /// Routes one row batch to `(query_id, source_id)`.
    ///
    /// Delivered immediately if a consumer is attached, otherwise buffered.
    /// Returns [`RouterError::QueryDeleted`] if the query has already been
    /// torn down; callers (the stream handler) treat this as a signal to
    /// abort the producer stream.
    pub fn route(
        &self,
        query_id: QueryId,
        source_id: SourceId,
        batch: RowBatchPayload,
    ) -> Result<(), RouterError> {
        let entry = self
            .entry_for(query_id)
            .ok_or(RouterError::QueryDeleted { query_id })?;

        let mut inner = entry.inner.lock();
        if inner.deleted {
            return Err(RouterError::QueryDeleted { query_id });
        }
        inner.sources.entry(source_id).or_default().route(batch);
        Ok(())
    }

    /// Marks `StreamInit` for `(query_id, source_id)`.
    ///
    /// Returns [`RouterError::FailedPrecondition`] if this source already
    /// observed a `StreamInit` — the stream handler turns that into a
    /// stream-fatal error while leaving all prior state untouched.
    pub fn mark_initiated(
        &self,
        query_id: QueryId,
        source_id: SourceId,
    ) -> Result<(), RouterError> {
        let entry = self
            .entry_for(query_id)
            .ok_or(RouterError::QueryDeleted { query_id })?;

        let mut inner = entry.inner.lock();
        if inner.deleted {
            return Err(RouterError::QueryDeleted { query_id });
        }
        let slot = inner.sources.entry(source_id).or_default();
        if slot.mark_initiated() {
            Ok(())
        } else {
            Err(RouterError::FailedPrecondition {
                query_id,
                source_id,
            })
        }
    }

    /// Marks the producer side of `(query_id, source_id)` closed, whether by
    /// clean half-close or by transport error. Idempotent.
    pub fn mark_closed(&self, query_id: QueryId, source_id: SourceId) -> Result<(), RouterError> {
        let Some(entry) = self.existing_entry(query_id) else {
            // A query that was never referenced, or already deleted, has
            // nothing to close; both are silent no-ops for this call.
            return Ok(());
        };

        let mut inner = entry.inner.lock();
        if inner.deleted {
            return Ok(());
        }
        inner.sources.entry(source_id).or_default().mark_closed();
        Ok(())
    }

    /// Appends one `Stats` chunk's agent entries to the query's per-agent
    /// stats list.
    pub fn append_stats(
        &self,
        query_id: QueryId,
        agents: Vec<AgentExecutionStats>,
    ) -> Result<(), RouterError> {
        let entry = self
            .entry_for(query_id)
            .ok_or(RouterError::QueryDeleted { query_id })?;

        let mut inner = entry.inner.lock();
        if inner.deleted {
            return Err(RouterError::QueryDeleted { query_id });
        }
        inner.stats.extend(agents);
        Ok(())
    }

    /// Returns the subset of a query's reported agent stats matching
    /// `agent_ids`, without blocking if some requested agent has not
    /// reported yet.
    pub fn get_incoming_worker_exec_stats(
        &self,
        query_id: QueryId,
        agent_ids: &[AgentId],
    ) -> Result<Vec<AgentExecutionStats>, RouterError> {
        let Some(entry) = self.existing_entry(query_id) else {
            return Err(RouterError::QueryDeleted { query_id });
        };

        let inner = entry.inner.lock();
        if inner.deleted {
            return Err(RouterError::QueryDeleted { query_id });
        }
        Ok(inner
            .stats
            .iter()
            .filter(|s| agent_ids.contains(&s.agent_id))
            .cloned()
            .collect())
    }

    /// Tears down a query: safe to call exactly once, zero or more times,
    /// from any thread, at any time.
    ///
    /// After this returns, no wake callback for `query_id` will fire again,
    /// concurrently arriving producer chunks for it are dropped, and
    /// `add_grpc_source_node` fails with `QueryDeleted`. A second call is a
    /// no-op.
    pub fn delete_query(&self, query_id: QueryId) {
        let removed = self.queries.lock().remove(&query_id);
        self.tombstones.lock().record(query_id);

        let Some(entry) = removed else {
            debug!(%query_id, "delete_query: no entry to remove");
            return;
        };

        let mut inner = entry.inner.lock();
        inner.deleted = true;
        for slot in inner.sources.values_mut() {
            slot.clear();
        }
        debug!(%query_id, sources = inner.sources.len(), "query deleted");
    }
}
