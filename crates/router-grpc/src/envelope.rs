//! Envelope decoder: classifies one inbound wire message as `StreamInit`,
//! `RowBatch`, `Stats`, or rejects it as malformed.
//!
//! Classification is evaluated in a fixed order — a message carrying
//! `execution_and_timing_info` is always `Stats` even if it also happened to
//! carry a `query_result`, because the two are mutually exclusive at the
//! `oneof` level and the wire type cannot express both.

use crate::pb::resultrouter::v1::{
    query_result_chunk, transfer_result_chunk_request, AgentExecutionStats as PbAgentStats,
    TransferResultChunkRequest,
};
use bytes::Bytes;
use router_types::{
    AgentExecutionStats, AgentId, Chunk, OperatorStats, QueryId, RouterError, RowBatchPayload,
    SourceId,
};

/// Decodes one inbound request into a routable [`Chunk`], or rejects it.
///
/// On `Err`, the stream handler fails the RPC with a failed status and
/// closes the stream; it does not attempt to recover
/// partial state from a malformed message.
pub fn decode_chunk(req: &TransferResultChunkRequest) -> Result<Chunk, RouterError> {
    let query_id = match &req.query_id {
        Some(q) => QueryId::new(q.high_bits, q.low_bits),
        None => {
            return Err(RouterError::Malformed {
                reason: "request is missing query_id".to_string(),
            })
        }
    };

    match &req.msg {
        Some(transfer_result_chunk_request::Msg::ExecutionAndTimingInfo(info)) => {
            Ok(Chunk::Stats {
                query_id,
                agents: info
                    .agent_execution_stats
                    .iter()
                    .map(decode_agent_stats)
                    .collect(),
            })
        }
        Some(transfer_result_chunk_request::Msg::QueryResult(query_result)) => {
            let source_id = SourceId::new(query_result.grpc_source_id);
            match &query_result.result {
                Some(query_result_chunk::Result::InitiateResultStream(true)) => {
                    Ok(Chunk::StreamInit {
                        query_id,
                        source_id,
                    })
                }
                Some(query_result_chunk::Result::RowBatch(row_batch)) => Ok(Chunk::RowBatch {
                    query_id,
                    source_id,
                    payload: RowBatchPayload::new(Bytes::copy_from_slice(&row_batch.data), row_batch.eos),
                }),
                Some(query_result_chunk::Result::InitiateResultStream(false)) | None => {
                    Err(RouterError::Malformed {
                        reason: "query_result carries neither a row batch nor a stream \
                                 initiation"
                            .to_string(),
                    })
                }
            }
        }
        None => Err(RouterError::Malformed {
            reason: "request carries neither query_result nor execution_and_timing_info"
                .to_string(),
        }),
    }
}

fn decode_agent_stats(stats: &PbAgentStats) -> AgentExecutionStats {
    AgentExecutionStats {
        agent_id: stats
            .agent_id
            .as_ref()
            .map(|id| AgentId::new(id.high_bits, id.low_bits))
            .unwrap_or(AgentId::new(0, 0)),
        operator_stats: stats
            .operator_execution_stats
            .iter()
            .map(|o| OperatorStats {
                bytes_output: o.bytes_output,
                records_output: o.records_output,
                total_execution_time_ns: o.total_execution_time_ns,
                self_execution_time_ns: o.self_execution_time_ns,
            })
            .collect(),
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pb::resultrouter::v1::{
        transfer_result_chunk_request::Msg, AgentUuid, ExecutionAndTimingInfo, OperatorExecutionStats,
        QueryResultChunk, QueryUuid, RowBatchData,
    };

    fn query_uuid() -> QueryUuid {
        QueryUuid {
            high_bits: 0xea8a_a095_697f_49f1,
            low_bits: 0xb127_d50e_5b6e_2645,
        }
    }

    #[test]
    fn missing_query_id_is_malformed() {
        let req = TransferResultChunkRequest {
            query_id: None,
            msg: Some(Msg::QueryResult(QueryResultChunk {
                grpc_source_id: 1,
                result: Some(query_result_chunk::Result::InitiateResultStream(true)),
            })),
        };
        assert!(matches!(
            decode_chunk(&req),
            Err(RouterError::Malformed { .. })
        ));
    }

    #[test]
    fn stream_init_is_classified_correctly() {
        let req = TransferResultChunkRequest {
            query_id: Some(query_uuid()),
            msg: Some(Msg::QueryResult(QueryResultChunk {
                grpc_source_id: 1,
                result: Some(query_result_chunk::Result::InitiateResultStream(true)),
            })),
        };
        let chunk = decode_chunk(&req).unwrap();
        assert!(matches!(chunk, Chunk::StreamInit { .. }));
    }

    #[test]
    fn row_batch_is_classified_correctly_and_payload_is_preserved_verbatim() {
        let req = TransferResultChunkRequest {
            query_id: Some(query_uuid()),
            msg: Some(Msg::QueryResult(QueryResultChunk {
                grpc_source_id: 1,
                result: Some(query_result_chunk::Result::RowBatch(RowBatchData {
                    data: vec![1, 2, 3],
                    eos: true,
                })),
            })),
        };
        match decode_chunk(&req).unwrap() {
            Chunk::RowBatch { payload, .. } => {
                assert_eq!(payload.bytes.as_ref(), &[1, 2, 3]);
                assert!(payload.eos);
            }
            other => panic!("expected RowBatch, got {other:?}"),
        }
    }

    #[test]
    fn stats_take_priority_even_if_query_result_were_also_present() {
        let req = TransferResultChunkRequest {
            query_id: Some(query_uuid()),
            msg: Some(Msg::ExecutionAndTimingInfo(ExecutionAndTimingInfo {
                agent_execution_stats: vec![PbAgentStats {
                    agent_id: Some(AgentUuid {
                        high_bits: 1,
                        low_bits: 2,
                    }),
                    operator_execution_stats: vec![OperatorExecutionStats {
                        bytes_output: 123,
                        records_output: 1,
                        total_execution_time_ns: 10_000,
                        self_execution_time_ns: 5_000,
                    }],
                }],
            })),
        };
        match decode_chunk(&req).unwrap() {
            Chunk::Stats { agents, .. } => {
                assert_eq!(agents.len(), 1);
                assert_eq!(agents[0].operator_stats[0].bytes_output, 123);
            }
            other => panic!("expected Stats, got {other:?}"),
        }
    }

    #[test]
    fn query_result_with_neither_variant_is_malformed() {
        let req = TransferResultChunkRequest {
            query_id: Some(query_uuid()),
            msg: Some(Msg::QueryResult(QueryResultChunk {
                grpc_source_id: 1,
                result: None,
            })),
        };
        assert!(matches!(
            decode_chunk(&req),
            Err(RouterError::Malformed { .. })
        ));
    }
}
