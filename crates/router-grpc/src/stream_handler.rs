//! Per-RPC-stream handler: reads chunks off one bidirectional stream until
//! half-close or error, routing each to the consumer registry and closing out
//! every source this stream itself initiated.

use crate::envelope::decode_chunk;
use crate::pb::resultrouter::v1::{TransferResultChunkRequest, TransferResultChunkResponse};
use router_core::ConsumerRegistry;
use router_types::{Chunk, QueryId, RouterError, SourceId};
use std::collections::HashSet;
use std::sync::Arc;
use tonic::{Status, Streaming};
use tracing::{debug, warn};

/// Drives one inbound stream to completion and produces the single response
/// the RPC returns on stream completion.
pub async fn handle_stream(
    registry: Arc<ConsumerRegistry>,
    mut inbound: Streaming<TransferResultChunkRequest>,
) -> Result<TransferResultChunkResponse, Status> {
    // Sources *this* stream sent StreamInit for; on half-close or error we
    // only close out sources we ourselves opened, never another stream's.
    let mut initiated_by_this_stream: HashSet<(QueryId, SourceId)> = HashSet::new();

    loop {
        match inbound.message().await {
            Ok(Some(request)) => {
                if let Err(status) =
                    handle_one_chunk(&registry, &request, &mut initiated_by_this_stream)
                {
                    close_initiated_sources(&registry, &initiated_by_this_stream);
                    return Err(status);
                }
            }
            Ok(None) => break,
            Err(status) => {
                // A transport error mid-stream is end-of-stream for every
                // source this stream opened; the producer's responsibility
                // to retry lives above the router.
                warn!(error = %status, "stream ended with a transport error");
                close_initiated_sources(&registry, &initiated_by_this_stream);
                return Err(status);
            }
        }
    }

    close_initiated_sources(&registry, &initiated_by_this_stream);
    Ok(TransferResultChunkResponse {
        success: true,
        message: String::new(),
    })
}

fn handle_one_chunk(
    registry: &ConsumerRegistry,
    request: &TransferResultChunkRequest,
    initiated_by_this_stream: &mut HashSet<(QueryId, SourceId)>,
) -> Result<(), Status> {
    let chunk = decode_chunk(request).map_err(status_from_router_error)?;

    match chunk {
        Chunk::StreamInit {
            query_id,
            source_id,
        } => match registry.mark_initiated(query_id, source_id) {
            Ok(()) => {
                let _ = initiated_by_this_stream.insert((query_id, source_id));
                Ok(())
            }
            Err(err @ RouterError::FailedPrecondition { .. }) => Err(status_from_router_error(err)),
            Err(RouterError::QueryDeleted { .. }) => Ok(()),
            Err(err) => Err(status_from_router_error(err)),
        },
        Chunk::RowBatch {
            query_id,
            source_id,
            payload,
        } => match registry.route(query_id, source_id, payload) {
            Ok(()) => Ok(()),
            Err(RouterError::QueryDeleted { query_id }) => {
                debug!(%query_id, %source_id, "dropping row batch and cancelling stream for deleted query");
                Err(Status::aborted(format!("query {query_id} has been deleted")))
            }
            Err(err) => Err(status_from_router_error(err)),
        },
        Chunk::Stats { query_id, agents } => match registry.append_stats(query_id, agents) {
            Ok(()) | Err(RouterError::QueryDeleted { .. }) => Ok(()),
            Err(err) => Err(status_from_router_error(err)),
        },
    }
}

fn close_initiated_sources(
    registry: &ConsumerRegistry,
    initiated_by_this_stream: &HashSet<(QueryId, SourceId)>,
) {
    for (query_id, source_id) in initiated_by_this_stream {
        let _ = registry.mark_closed(*query_id, *source_id);
    }
}

fn status_from_router_error(err: RouterError) -> Status {
    match err {
        RouterError::Malformed { reason } => Status::invalid_argument(reason),
        RouterError::FailedPrecondition { .. } => Status::failed_precondition(err.to_string()),
        RouterError::QueryDeleted { .. } => Status::aborted(err.to_string()),
        RouterError::AlreadyRegistered { .. } => Status::internal(err.to_string()),
        RouterError::Internal { .. } => Status::internal(err.to_string()),
    }
}
