use crate::AgentId;

/// Per-operator execution counters reported by a remote agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperatorStats {
    /// Bytes emitted by the operator.
    pub bytes_output: u64,
    /// Rows emitted by the operator.
    pub records_output: u64,
    /// Wall-clock time the operator spent executing, including children.
    pub total_execution_time_ns: u64,
    /// Wall-clock time attributable to the operator alone.
    pub self_execution_time_ns: u64,
}

/// The execution statistics a single agent reported for a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentExecutionStats {
    /// The agent that reported these statistics.
    pub agent_id: AgentId,
    /// One entry per operator in the agent's plan fragment, in report order.
    pub operator_stats: Vec<OperatorStats>,
}
