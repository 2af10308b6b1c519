use serde::Serialize;

/// Running counters of the kill-flow prover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KillFlowStats {
    /// Mod/ref queries answered by the kill-flow layer.
    pub queries: u64,
    /// Must-alias questions forwarded to the lower oracle.
    pub sub_queries: u64,
    pub fcn_summary_hits: u64,
    pub bb_summary_hits: u64,
    pub eligible_backward_loads: u64,
    pub killed_backward_loads: u64,
    pub eligible_backward_stores: u64,
    pub killed_backward_stores: u64,
    pub eligible_forward_stores: u64,
    pub killed_forward_stores: u64,
    pub eligible_forward_loads: u64,
    pub killed_forward_loads: u64,
    /// Kills proven by an inner loop overwriting a whole array.
    pub array_overwrites: u64,
    pub unreachable_blocks: u64,
    pub timeouts: u64,
}

/// Running counters of the call-site depth combinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinatorStats {
    pub cache_hits: u64,
    pub eligible: u64,
    pub flow_tests: u64,
    pub killed_store_after_src: u64,
    pub killed_store_before_dst: u64,
    pub killed_store_between: u64,
    pub killed_store_in_load_ctx: u64,
    pub killed_load_before_dst: u64,
    pub killed_load_after_src: u64,
    pub killed_load_between: u64,
    pub killed_load_in_store_ctx: u64,
    pub killed_aggregate_store: u64,
    pub killed_aggregate_load: u64,
    /// Flows dismissed by the alias query alone.
    pub disproved_by_modref: u64,
    pub timeouts: u64,
}

impl CombinatorStats {
    /// Flows disproved by any kill test.
    pub fn total_kills(&self) -> u64 {
        self.killed_store_after_src
            + self.killed_store_before_dst
            + self.killed_store_between
            + self.killed_store_in_load_ctx
            + self.killed_load_before_dst
            + self.killed_load_after_src
            + self.killed_load_between
            + self.killed_load_in_store_ctx
            + self.killed_aggregate_store
            + self.killed_aggregate_load
    }
}
