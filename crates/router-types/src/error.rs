use crate::{QueryId, SourceId};

/// Errors the router surfaces to its RPC and local-interface callers.
///
/// These map directly to the error kinds named in the router's design: each
/// variant is a distinct, externally observable outcome rather than a wrapper
/// around some lower-level cause.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The inbound envelope did not match any known classification.
    #[error("malformed chunk: {reason}")]
    Malformed {
        /// Human-readable classification failure.
        reason: String,
    },

    /// `AddGRPCSourceNode` was called twice for the same `(query, source)`
    /// with two different consumer identities.
    #[error("source {source_id} of query {query_id} already has a different consumer registered")]
    AlreadyRegistered {
        /// Query the conflicting registration targeted.
        query_id: QueryId,
        /// Source the conflicting registration targeted.
        source_id: SourceId,
    },

    /// The operation referenced a query that has already been torn down via
    /// `DeleteQuery`.
    #[error("query {query_id} has been deleted")]
    QueryDeleted {
        /// The deleted query.
        query_id: QueryId,
    },

    /// A duplicate `StreamInit` arrived for a source that was already
    /// initiated.
    #[error("source {source_id} of query {query_id} received a duplicate StreamInit")]
    FailedPrecondition {
        /// Query the duplicate initiation targeted.
        query_id: QueryId,
        /// Source the duplicate initiation targeted.
        source_id: SourceId,
    },

    /// An invariant the router relies on was violated. This should never
    /// occur in production; it is surfaced so the caller can log and, in
    /// debug builds, fail loudly rather than silently corrupt state.
    #[error("internal router invariant violated: {reason}")]
    Internal {
        /// Description of the violated invariant.
        reason: String,
    },
}

impl RouterError {
    /// Short, stable machine-readable label for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::Malformed { .. } => "malformed",
            RouterError::AlreadyRegistered { .. } => "already_registered",
            RouterError::QueryDeleted { .. } => "query_deleted",
            RouterError::FailedPrecondition { .. } => "failed_precondition",
            RouterError::Internal { .. } => "internal",
        }
    }
}
