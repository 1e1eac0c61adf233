//! Wire-independent data model shared by the router's gRPC surface and its
//! in-process consumer registry.
//!
//! Nothing in this crate knows about tonic, prost, or sockets: it only
//! describes the identifiers and envelopes the router reasons about once a
//! chunk has been decoded off the wire.

use std::fmt;

mod error;
mod ids;
mod stats;

pub use error::RouterError;
pub use ids::{AgentId, QueryId, SourceId};
pub use stats::{AgentExecutionStats, OperatorStats};

/// An opaque, verbatim-forwarded row batch payload.
///
/// The router never inspects the bytes; it moves them from producer to
/// consumer without copying or reinterpreting the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowBatchPayload {
    /// Encoded row batch bytes, opaque to the router.
    pub bytes: bytes::Bytes,
    /// True if this batch is the last one the producing stream will send for
    /// its source (end-of-window/end-of-stream marker on the batch itself,
    /// distinct from the RPC half-close).
    pub eos: bool,
}

impl RowBatchPayload {
    /// Builds a payload from raw bytes with an explicit end-of-stream flag.
    #[must_use]
    pub fn new(bytes: bytes::Bytes, eos: bool) -> Self {
        Self { bytes, eos }
    }
}

/// A single inbound chunk, classified by the envelope decoder.
///
/// `Chunk` is the decoder's output type; a malformed message never becomes a
/// `Chunk` at all, it is rejected as a [`RouterError::Malformed`] before
/// reaching routing logic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// Marks the start of a producer stream for `(query_id, source_id)`.
    StreamInit {
        /// Query the stream belongs to.
        query_id: QueryId,
        /// Source within the query this stream will produce batches for.
        source_id: SourceId,
    },
    /// One row batch addressed to a specific `(query_id, source_id)`.
    RowBatch {
        /// Query the batch belongs to.
        query_id: QueryId,
        /// Source within the query the batch was produced for.
        source_id: SourceId,
        /// The batch payload, forwarded verbatim to the consumer.
        payload: RowBatchPayload,
    },
    /// Execution statistics reported by an agent, independent of any source.
    Stats {
        /// Query the statistics belong to.
        query_id: QueryId,
        /// One entry per agent present in this message.
        agents: Vec<AgentExecutionStats>,
    },
}

impl Chunk {
    /// The query this chunk belongs to, regardless of variant.
    #[must_use]
    pub fn query_id(&self) -> QueryId {
        match self {
            Chunk::StreamInit { query_id, .. }
            | Chunk::RowBatch { query_id, .. }
            | Chunk::Stats { query_id, .. } => *query_id,
        }
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chunk::StreamInit {
                query_id,
                source_id,
            } => write!(f, "StreamInit({query_id}, {source_id})"),
            Chunk::RowBatch {
                query_id,
                source_id,
                payload,
            } => write!(
                f,
                "RowBatch({query_id}, {source_id}, {} bytes, eos={})",
                payload.bytes.len(),
                payload.eos
            ),
            Chunk::Stats { query_id, agents } => {
                write!(f, "Stats({query_id}, {} agents)", agents.len())
            }
        }
    }
}
