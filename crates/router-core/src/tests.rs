use crate::testing::{MockConsumer, WakeCounter};
use crate::ConsumerRegistry;
use bytes::Bytes;
use router_types::{AgentExecutionStats, AgentId, OperatorStats, QueryId, RowBatchPayload, SourceId};
use std::sync::Arc;

const QID: QueryId = QueryId::new(0xea8a_a095_697f_49f1, 0xb127_d50e_5b6e_2645);
const SRC: SourceId = SourceId::new(1);

fn batch(n: i64) -> RowBatchPayload {
    RowBatchPayload::new(Bytes::from(n.to_le_bytes().to_vec()), false)
}

fn batches_as_i64(payloads: &[RowBatchPayload]) -> Vec<i64> {
    payloads
        .iter()
        .map(|p| i64::from_le_bytes(p.bytes.as_ref().try_into().unwrap()))
        .collect()
}

#[test]
fn producer_first_then_consumer_drains_in_order_with_one_wake_per_batch() {
    let registry = ConsumerRegistry::new();

    registry
        .mark_initiated(QID, SRC)
        .expect("mark_initiated on fresh query");
    registry.route(QID, SRC, batch(1)).unwrap();
    registry.route(QID, SRC, batch(2)).unwrap();
    registry.mark_closed(QID, SRC).unwrap();

    let consumer = Arc::new(MockConsumer::new());
    let wakes = Arc::new(WakeCounter::new());
    registry
        .add_grpc_source_node(
            QID,
            SRC,
            Arc::clone(&consumer) as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .expect("register consumer");

    assert!(consumer.initiated());
    assert!(consumer.closed());
    assert_eq!(batches_as_i64(&consumer.batches()), vec![1, 2]);
    assert_eq!(wakes.count(), 2);
}

#[test]
fn consumer_first_then_producer_delivers_live_with_one_wake_per_batch() {
    let registry = ConsumerRegistry::new();

    let consumer = Arc::new(MockConsumer::new());
    let wakes = Arc::new(WakeCounter::new());
    registry
        .add_grpc_source_node(
            QID,
            SRC,
            Arc::clone(&consumer) as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .expect("register consumer before any producer traffic");

    assert!(!consumer.initiated());
    assert!(consumer.batches().is_empty());
    assert_eq!(wakes.count(), 0);

    registry.mark_initiated(QID, SRC).unwrap();
    registry.route(QID, SRC, batch(1)).unwrap();
    registry.route(QID, SRC, batch(2)).unwrap();
    registry.mark_closed(QID, SRC).unwrap();

    assert!(consumer.initiated());
    assert!(consumer.closed());
    assert_eq!(batches_as_i64(&consumer.batches()), vec![1, 2]);
    assert_eq!(wakes.count(), 2);
}

#[test]
fn stats_are_filtered_by_requested_agent_and_round_trip_verbatim() {
    let registry = ConsumerRegistry::new();
    let agent = AgentId::new(0xe302_d3f9_f20a_44a3, 0xbdc5_36fc_14ed_9089);
    let other_agent = AgentId::new(1, 1);

    registry
        .append_stats(
            QID,
            vec![AgentExecutionStats {
                agent_id: agent,
                operator_stats: vec![
                    OperatorStats {
                        bytes_output: 123,
                        records_output: 1,
                        total_execution_time_ns: 10_000,
                        self_execution_time_ns: 5_000,
                    },
                    OperatorStats {
                        bytes_output: 0,
                        records_output: 0,
                        total_execution_time_ns: 5_000,
                        self_execution_time_ns: 5_000,
                    },
                ],
            }],
        )
        .unwrap();

    let result = registry
        .get_incoming_worker_exec_stats(QID, &[agent])
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].agent_id, agent);
    assert_eq!(result[0].operator_stats.len(), 2);
    assert_eq!(result[0].operator_stats[0].bytes_output, 123);

    // An agent that never reported yields an empty, non-blocking result.
    let empty = registry
        .get_incoming_worker_exec_stats(QID, &[other_agent])
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn stats_only_query_does_not_require_a_source_registration() {
    let registry = ConsumerRegistry::new();
    let agent = AgentId::new(9, 9);
    registry
        .append_stats(
            QID,
            vec![AgentExecutionStats {
                agent_id: agent,
                operator_stats: vec![],
            }],
        )
        .unwrap();
    let result = registry
        .get_incoming_worker_exec_stats(QID, &[agent])
        .unwrap();
    assert_eq!(result.len(), 1);
}

#[test]
fn delete_before_consumer_rejects_registration_and_drops_routed_batches() {
    let registry = ConsumerRegistry::new();
    let consumer = Arc::new(MockConsumer::new());
    let wakes = Arc::new(WakeCounter::new());
    registry
        .add_grpc_source_node(
            QID,
            SRC,
            Arc::clone(&consumer) as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .unwrap();

    registry.delete_query(QID);

    let route_result = registry.route(QID, SRC, batch(1));
    assert!(matches!(
        route_result,
        Err(router_types::RouterError::QueryDeleted { .. })
    ));

    let another = Arc::new(MockConsumer::new());
    let wakes2 = Arc::new(WakeCounter::new());
    let register_result = registry.add_grpc_source_node(
        QID,
        SRC,
        another as Arc<dyn crate::Consumer>,
        wakes2.into_wake_fn(),
    );
    assert!(matches!(
        register_result,
        Err(router_types::RouterError::QueryDeleted { .. })
    ));

    // No batch reached the already-deleted consumer, and no extra wakes fired.
    assert!(consumer.batches().is_empty());
    assert_eq!(wakes.count(), 0);
}

#[test]
fn delete_query_is_idempotent() {
    let registry = ConsumerRegistry::new();
    registry.route(QID, SRC, batch(1)).unwrap();
    registry.delete_query(QID);
    registry.delete_query(QID); // must not panic or change observable state
    assert!(matches!(
        registry.route(QID, SRC, batch(2)),
        Err(router_types::RouterError::QueryDeleted { .. })
    ));
}

#[test]
fn duplicate_stream_init_is_rejected_and_existing_state_survives() {
    let registry = ConsumerRegistry::new();
    registry.mark_initiated(QID, SRC).unwrap();
    registry.route(QID, SRC, batch(1)).unwrap();

    let err = registry.mark_initiated(QID, SRC).unwrap_err();
    assert!(matches!(
        err,
        router_types::RouterError::FailedPrecondition { .. }
    ));

    // The first stream's batch is still there, waiting for a consumer.
    let consumer = Arc::new(MockConsumer::new());
    let wakes = Arc::new(WakeCounter::new());
    registry
        .add_grpc_source_node(
            QID,
            SRC,
            Arc::clone(&consumer) as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .unwrap();
    assert_eq!(batches_as_i64(&consumer.batches()), vec![1]);
    assert!(consumer.initiated());
}

#[test]
fn reregistering_the_same_consumer_pointer_is_a_no_op() {
    let registry = ConsumerRegistry::new();
    let consumer = Arc::new(MockConsumer::new());
    let wakes = Arc::new(WakeCounter::new());

    registry
        .add_grpc_source_node(
            QID,
            SRC,
            Arc::clone(&consumer) as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .unwrap();
    registry
        .add_grpc_source_node(
            QID,
            SRC,
            Arc::clone(&consumer) as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .expect("re-registering the same pointer is idempotent");
}

#[test]
fn reregistering_a_different_consumer_pointer_is_rejected() {
    let registry = ConsumerRegistry::new();
    let consumer_a = Arc::new(MockConsumer::new());
    let consumer_b = Arc::new(MockConsumer::new());
    let wakes = Arc::new(WakeCounter::new());

    registry
        .add_grpc_source_node(
            QID,
            SRC,
            consumer_a as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .unwrap();

    let err = registry
        .add_grpc_source_node(
            QID,
            SRC,
            consumer_b as Arc<dyn crate::Consumer>,
            wakes.into_wake_fn(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        router_types::RouterError::AlreadyRegistered { .. }
    ));
}

#[test]
fn distinct_sources_within_a_query_are_independent() {
    let registry = ConsumerRegistry::new();
    let source_a = SourceId::new(1);
    let source_b = SourceId::new(2);

    registry.route(QID, source_a, batch(10)).unwrap();
    registry.mark_initiated(QID, source_b).unwrap();

    let consumer_a = Arc::new(MockConsumer::new());
    let consumer_b = Arc::new(MockConsumer::new());
    let wakes_a = Arc::new(WakeCounter::new());
    let wakes_b = Arc::new(WakeCounter::new());

    registry
        .add_grpc_source_node(
            QID,
            source_a,
            Arc::clone(&consumer_a) as Arc<dyn crate::Consumer>,
            wakes_a.into_wake_fn(),
        )
        .unwrap();
    registry
        .add_grpc_source_node(
            QID,
            source_b,
            Arc::clone(&consumer_b) as Arc<dyn crate::Consumer>,
            wakes_b.into_wake_fn(),
        )
        .unwrap();

    assert_eq!(batches_as_i64(&consumer_a.batches()), vec![10]);
    assert!(!consumer_a.initiated());
    assert!(consumer_b.batches().is_empty());
    assert!(consumer_b.initiated());
}
