/*! The kill-flow prover.
 *
 * A value stored in one iteration cannot reach a load in a later iteration if every path between
 * them definitely overwrites the location. `KillFlow` proves such kills by walking the dominator
 * tree (kills before a point), the post-dominator tree (kills after a point) or both (kills
 * between two points), scanning each block for a store that must alias the pointer. Calls to
 * defined functions are summarised by the blocks post-dominating their entry.
 *
 * Block and function summaries are memoized per pointer. While a summary is being computed a
 * pessimistic placeholder stands in for it, so recursive call graphs terminate; a cached `false`
 * only means "not proven".
 */

mod array_kill;

use crate::basic::BasicAliasOracle;
use crate::budget::QueryBudget;
use crate::config::AnalysisConfig;
use crate::oracle::{AliasOracle, AliasResult, KillProver, ModRefResult, TemporalRelation};
use crate::stats::KillFlowStats;
use killflow_core::analysis::objects::{object_extent, Extent};
use killflow_core::analysis::{underlying_object, underlying_objects};
use killflow_core::{
    BlockId, DominanceProvider, FuncId, GlobalId, InstId, InstKind, Intrinsic, Loop, Program,
    Value,
};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

pub struct KillFlow<'p> {
    program: &'p Program,
    dominance: &'p dyn DominanceProvider,
    lower: Box<dyn AliasOracle + 'p>,
    config: AnalysisConfig,
    fcn_kills: HashMap<(FuncId, Value), bool>,
    fcn_aggregate_kills: HashMap<(FuncId, Value), bool>,
    bb_kills: HashMap<(BlockId, Value), bool>,
    no_stores_between: HashMap<(InstId, InstId, GlobalId), bool>,
    stats: KillFlowStats,
}

impl<'p> KillFlow<'p> {
    pub fn new(
        program: &'p Program,
        dominance: &'p dyn DominanceProvider,
        lower: Box<dyn AliasOracle + 'p>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            program,
            dominance,
            lower,
            config,
            fcn_kills: HashMap::new(),
            fcn_aggregate_kills: HashMap::new(),
            bb_kills: HashMap::new(),
            no_stores_between: HashMap::new(),
            stats: KillFlowStats::default(),
        }
    }

    /// A prover stacked on [`BasicAliasOracle`].
    pub fn with_basic_oracle(
        program: &'p Program,
        dominance: &'p dyn DominanceProvider,
        config: AnalysisConfig,
    ) -> Self {
        Self::new(
            program,
            dominance,
            Box::new(BasicAliasOracle::new(program)),
            config,
        )
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn stats(&self) -> &KillFlowStats {
        &self.stats
    }

    pub fn lower_oracle_name(&self) -> &'static str {
        self.lower.name()
    }

    /// Drops every memoized summary. Summaries are only valid for the oracle stack they were
    /// computed against.
    pub fn invalidate(&mut self) {
        debug!(
            functions = self.fcn_kills.len() + self.fcn_aggregate_kills.len(),
            blocks = self.bb_kills.len(),
            "invalidating kill summaries"
        );
        self.fcn_kills.clear();
        self.fcn_aggregate_kills.clear();
        self.bb_kills.clear();
        self.no_stores_between.clear();
    }

    pub fn replace_lower_oracle(&mut self, lower: Box<dyn AliasOracle + 'p>) {
        self.lower = lower;
        self.invalidate();
    }

    /// Whether some instruction of `bb` between `after` and `before` (both exclusive, and only
    /// when they lie in `bb`) must overwrite `ptr`.
    pub fn block_must_kill(
        &mut self,
        bb: BlockId,
        ptr: Value,
        after: Option<InstId>,
        before: Option<InstId>,
        lp: Option<&Loop>,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        let whole = !touches(program, bb, after) && !touches(program, bb, before);
        let key = (bb, ptr);

        if let Some(&cached) = self.bb_kills.get(&key) {
            if !cached || whole {
                self.stats.bb_summary_hits += 1;
                return cached;
            }
        }

        for &inst in scan_range(program, bb, after, before) {
            if !program.may_write_memory(inst) {
                continue;
            }

            let pessimize = !self.bb_kills.contains_key(&key);
            if pessimize {
                self.bb_kills.insert(key, false);
            }
            let killed = self.inst_must_kill(inst, ptr, budget);
            if pessimize {
                self.bb_kills.remove(&key);
            }

            if killed {
                trace!(
                    ptr = %program.value_name(ptr),
                    by = %program.inst_label(inst),
                    "pointer killed"
                );
                self.bb_kills.insert(key, true);
                return true;
            }
        }

        if !whole {
            return false;
        }
        if let Some(lp) = lp {
            match self.array_overwrite(bb, ptr, after, before, lp) {
                Some(true) => {
                    self.bb_kills.insert(key, true);
                    return true;
                }
                Some(false) => {}
                None => return false,
            }
        }
        if !budget.expired() {
            self.bb_kills.insert(key, false);
        }
        false
    }

    /// Whether `inst`, when it executes, must overwrite `ptr`.
    pub fn inst_must_kill(&mut self, inst: InstId, ptr: Value, budget: &QueryBudget) -> bool {
        let program = self.program;
        match program.kind(inst) {
            InstKind::Intrinsic(Intrinsic::LifetimeStart(life))
            | InstKind::Intrinsic(Intrinsic::LifetimeEnd(life)) => self.must_alias_fast(*life, ptr),
            InstKind::Call { .. } => match program.callee(inst) {
                Some(func) if program.is_defined(func) => self.function_must_kill(func, ptr, budget),
                _ => false,
            },
            InstKind::Store { ptr: stored, .. } => self.must_alias(*stored, ptr),
            _ => false,
        }
    }

    fn function_must_kill(&mut self, func: FuncId, ptr: Value, budget: &QueryBudget) -> bool {
        let key = (func, ptr);
        if let Some(&cached) = self.fcn_kills.get(&key) {
            self.stats.fcn_summary_hits += 1;
            return cached;
        }

        self.fcn_kills.insert(key, false);
        let mut killed = false;
        for bb in self.entry_post_dominators(func) {
            if budget.expired() {
                break;
            }
            if self.block_must_kill(bb, ptr, None, None, None, budget) {
                killed = true;
                break;
            }
        }

        if killed || !budget.expired() {
            self.fcn_kills.insert(key, killed);
        } else {
            self.fcn_kills.remove(&key);
        }
        killed
    }

    /// Blocks that execute on every invocation of `func`: the post-dominator chain of its entry.
    fn entry_post_dominators(&self, func: FuncId) -> Vec<BlockId> {
        let entry = self.program.function(func).entry_block();
        match (entry, self.dominance().post_dominator_tree(func)) {
            (Some(entry), Some(pdt)) => pdt.ancestors(entry).collect(),
            _ => Vec::new(),
        }
    }

    /// Same single underlying object, without consulting the oracle stack.
    fn must_alias_fast(&self, a: Value, b: Value) -> bool {
        let objects = underlying_objects(self.program, a);
        objects.len() == 1 && objects == underlying_objects(self.program, b)
    }

    fn must_alias(&mut self, a: Value, b: Value) -> bool {
        if a == b && a.is_global() {
            return true;
        }
        self.stats.sub_queries += 1;
        self.lower.alias(a, b) == AliasResult::MustAlias
    }

    pub fn block_must_kill_aggregate(
        &mut self,
        bb: BlockId,
        object: Value,
        after: Option<InstId>,
        before: Option<InstId>,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        for &inst in scan_range(program, bb, after, before) {
            if program.may_write_memory(inst) && self.inst_must_kill_aggregate(inst, object, budget) {
                trace!(
                    object = %program.value_name(object),
                    by = %program.inst_label(inst),
                    "object killed"
                );
                return true;
            }
        }
        false
    }

    /// Whether `inst` must overwrite every element of `object`.
    pub fn inst_must_kill_aggregate(
        &mut self,
        inst: InstId,
        object: Value,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        match program.kind(inst) {
            InstKind::Intrinsic(Intrinsic::LifetimeStart(life))
            | InstKind::Intrinsic(Intrinsic::LifetimeEnd(life)) => {
                self.must_alias_fast(*life, object)
            }
            InstKind::Intrinsic(intrinsic) if intrinsic.is_mem_intrinsic() => {
                let (Some(dst), Some(len)) = (intrinsic.mem_dest(), intrinsic.mem_len()) else {
                    return false;
                };
                let killed = underlying_object(program, dst);
                addresses_start_of(program, dst, killed)
                    && self.must_alias(killed, object)
                    && self.covers_extent(len, killed)
            }
            InstKind::Store { ptr, .. } => {
                let killed = underlying_object(program, *ptr);
                addresses_start_of(program, *ptr, killed)
                    && object_extent(program, killed) == Some(Extent::Elements(1))
                    && self.must_alias(killed, object)
            }
            InstKind::Call { .. } => match program.callee(inst) {
                Some(func) if program.is_defined(func) => {
                    self.function_must_kill_aggregate(func, object, budget)
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn function_must_kill_aggregate(
        &mut self,
        func: FuncId,
        object: Value,
        budget: &QueryBudget,
    ) -> bool {
        let key = (func, object);
        if let Some(&cached) = self.fcn_aggregate_kills.get(&key) {
            self.stats.fcn_summary_hits += 1;
            return cached;
        }

        self.fcn_aggregate_kills.insert(key, false);
        let mut killed = false;
        for bb in self.entry_post_dominators(func) {
            if budget.expired() {
                break;
            }
            if self.block_must_kill_aggregate(bb, object, None, None, budget) {
                killed = true;
                break;
            }
        }

        if killed || !budget.expired() {
            self.fcn_aggregate_kills.insert(key, killed);
        } else {
            self.fcn_aggregate_kills.remove(&key);
        }
        killed
    }

    /// A memory intrinsic of `len` elements starting at `object` overwrites all of it.
    fn covers_extent(&mut self, len: Value, object: Value) -> bool {
        match object_extent(self.program, object) {
            Some(Extent::Elements(n)) => len
                .as_const()
                .and_then(|len| u64::try_from(len).ok())
                .map_or(false, |len| len >= n),
            Some(Extent::Dynamic(count)) => self.same_quantity(len, count),
            None => false,
        }
    }

    fn expired(&mut self, budget: &QueryBudget, query: &'static str) -> bool {
        if !budget.expired() {
            return false;
        }
        self.stats.timeouts += 1;
        warn!(query, elapsed = ?budget.elapsed(), "kill query timed out; assuming not killed");
        true
    }

    fn unreachable(&mut self, block: BlockId, tree: &'static str) {
        self.stats.unreachable_blocks += 1;
        let program = self.program;
        warn!(
            function = %program.function(program.block(block).func).name,
            block = %program.block(block).name,
            tree,
            "block is missing from the tree; assuming not killed"
        );
    }

    /// The address operand of a load or store, looking through one cast.
    fn mem_operand(&self, inst: InstId) -> Option<Value> {
        let ptr = self.program.pointer_operand(inst)?;
        match ptr {
            Value::Inst(id) => match self.program.kind(id) {
                InstKind::Cast { value } => Some(*value),
                _ => Some(ptr),
            },
            _ => Some(ptr),
        }
    }
}

/// Whether `inst` is given and lies in `bb`.
fn touches(program: &Program, bb: BlockId, inst: Option<InstId>) -> bool {
    inst.map_or(false, |i| program.block_of(i) == bb)
}

/// The instructions of `bb` strictly between the anchors that lie in it. Empty when `after` is
/// not earlier than `before`.
fn scan_range(
    program: &Program,
    bb: BlockId,
    after: Option<InstId>,
    before: Option<InstId>,
) -> &[InstId] {
    let insts = &program.block(bb).insts;
    let start = after
        .filter(|&i| program.block_of(i) == bb)
        .map_or(0, |i| program.position(i) + 1);
    let end = before
        .filter(|&i| program.block_of(i) == bb)
        .map_or(insts.len(), |i| program.position(i));
    if start >= end {
        &[]
    } else {
        &insts[start..end]
    }
}

/// Whether `ptr` is `object` itself, possibly behind casts and all-zero element offsets.
fn addresses_start_of(program: &Program, mut ptr: Value, object: Value) -> bool {
    loop {
        if ptr == object {
            return true;
        }
        let Value::Inst(inst) = ptr else {
            return false;
        };
        match program.kind(inst) {
            InstKind::Cast { value } => ptr = *value,
            InstKind::ElementPtr { base, indices }
                if indices.iter().all(|i| *i == Value::Const(0)) =>
            {
                ptr = *base
            }
            _ => return false,
        }
    }
}

impl<'p> KillProver<'p> for KillFlow<'p> {
    fn program(&self) -> &'p Program {
        self.program
    }

    fn dominance(&self) -> &'p dyn DominanceProvider {
        self.dominance
    }

    fn pointer_killed_before(
        &mut self,
        lp: Option<&Loop>,
        ptr: Value,
        before: InstId,
        also_check_aggregate: bool,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        let func = program.function_of(before);
        let start = program.block_of(before);
        let Some(dt) = self.dominance().dominator_tree(func) else {
            return false;
        };
        if !dt.contains(start) {
            self.unreachable(start, "dominator");
            return false;
        }

        for bb in dt.ancestors(start) {
            if self.expired(budget, "pointer_killed_before") {
                return false;
            }
            if lp.map_or(false, |l| !l.contains_block(bb)) {
                break;
            }
            if self.block_must_kill(bb, ptr, None, Some(before), lp, budget) {
                return true;
            }
        }

        if also_check_aggregate {
            let object = underlying_object(program, ptr);
            if object != ptr && self.aggregate_killed_before(lp, object, before, budget) {
                return true;
            }
        }
        false
    }

    fn pointer_killed_after(
        &mut self,
        lp: Option<&Loop>,
        ptr: Value,
        after: InstId,
        also_check_aggregate: bool,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        let func = program.function_of(after);
        let start = program.block_of(after);
        let Some(pdt) = self.dominance().post_dominator_tree(func) else {
            return false;
        };
        if !pdt.contains(start) {
            self.unreachable(start, "post-dominator");
            return false;
        }

        for bb in pdt.ancestors(start) {
            if self.expired(budget, "pointer_killed_after") {
                return false;
            }
            if lp.map_or(false, |l| !l.contains_block(bb)) {
                break;
            }
            if self.block_must_kill(bb, ptr, Some(after), None, lp, budget) {
                return true;
            }
        }

        if also_check_aggregate {
            let object = underlying_object(program, ptr);
            if object != ptr && self.aggregate_killed_after(lp, object, after, budget) {
                return true;
            }
        }
        false
    }

    fn pointer_killed_between(
        &mut self,
        lp: Option<&Loop>,
        ptr: Value,
        after: InstId,
        before: InstId,
        also_check_aggregate: bool,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        let func = program.function_of(before);
        if program.function_of(after) != func {
            return false;
        }
        let (after_bb, before_bb) = (program.block_of(after), program.block_of(before));
        let (Some(dt), Some(pdt)) = (
            self.dominance().dominator_tree(func),
            self.dominance().post_dominator_tree(func),
        ) else {
            return false;
        };
        if !dt.contains(before_bb) {
            self.unreachable(before_bb, "dominator");
            return false;
        }

        for bb in dt.ancestors(before_bb) {
            if self.expired(budget, "pointer_killed_between") {
                return false;
            }
            if lp.map_or(false, |l| !l.contains_block(bb)) {
                break;
            }
            if !pdt.dominates(bb, after_bb) {
                continue;
            }
            if self.block_must_kill(bb, ptr, Some(after), Some(before), lp, budget) {
                return true;
            }
        }

        if also_check_aggregate {
            let object = underlying_object(program, ptr);
            if object != ptr && self.aggregate_killed_between(lp, object, after, before, budget) {
                return true;
            }
        }
        false
    }

    fn aggregate_killed_before(
        &mut self,
        lp: Option<&Loop>,
        object: Value,
        before: InstId,
        budget: &QueryBudget,
    ) -> bool {
        let func = self.program.function_of(before);
        let start = self.program.block_of(before);
        let Some(dt) = self.dominance().dominator_tree(func) else {
            return false;
        };
        if !dt.contains(start) {
            self.unreachable(start, "dominator");
            return false;
        }

        for bb in dt.ancestors(start) {
            if self.expired(budget, "aggregate_killed_before") {
                return false;
            }
            if lp.map_or(false, |l| !l.contains_block(bb)) {
                break;
            }
            if self.block_must_kill_aggregate(bb, object, None, Some(before), budget) {
                return true;
            }
        }
        false
    }

    fn aggregate_killed_after(
        &mut self,
        lp: Option<&Loop>,
        object: Value,
        after: InstId,
        budget: &QueryBudget,
    ) -> bool {
        let func = self.program.function_of(after);
        let start = self.program.block_of(after);
        let Some(pdt) = self.dominance().post_dominator_tree(func) else {
            return false;
        };
        if !pdt.contains(start) {
            self.unreachable(start, "post-dominator");
            return false;
        }

        for bb in pdt.ancestors(start) {
            if self.expired(budget, "aggregate_killed_after") {
                return false;
            }
            if lp.map_or(false, |l| !l.contains_block(bb)) {
                break;
            }
            if self.block_must_kill_aggregate(bb, object, Some(after), None, budget) {
                return true;
            }
        }
        false
    }

    fn aggregate_killed_between(
        &mut self,
        lp: Option<&Loop>,
        object: Value,
        after: InstId,
        before: InstId,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program;
        let func = program.function_of(after);
        if program.function_of(before) != func {
            return false;
        }
        let (after_bb, before_bb) = (program.block_of(after), program.block_of(before));
        let (Some(dt), Some(pdt)) = (
            self.dominance().dominator_tree(func),
            self.dominance().post_dominator_tree(func),
        ) else {
            return false;
        };
        if !pdt.contains(after_bb) {
            self.unreachable(after_bb, "post-dominator");
            return false;
        }

        for bb in pdt.ancestors(after_bb) {
            if self.expired(budget, "aggregate_killed_between") {
                return false;
            }
            if lp.map_or(false, |l| !l.contains_block(bb)) {
                break;
            }
            if !dt.dominates(bb, before_bb) {
                continue;
            }
            if self.block_must_kill_aggregate(bb, object, Some(after), Some(before), budget) {
                return true;
            }
        }
        false
    }
}

impl AliasOracle for KillFlow<'_> {
    fn name(&self) -> &'static str {
        "kill-flow"
    }

    fn alias(&mut self, p1: Value, p2: Value) -> AliasResult {
        self.lower.alias(p1, p2)
    }

    /// Removes dependences whose memory is overwritten in between, given the lower answer.
    fn modref(
        &mut self,
        i1: InstId,
        rel: TemporalRelation,
        i2: InstId,
        lp: Option<&Loop>,
    ) -> ModRefResult {
        let result = self.lower.modref(i1, rel, i2, lp);
        if matches!(result, ModRefResult::NoModRef | ModRefResult::Ref) {
            return result;
        }
        let Some(lp) = lp else {
            return result;
        };

        self.stats.queries += 1;
        let program = self.program;
        let budget = QueryBudget::from_config(&self.config);
        let (ptr1, ptr2) = (self.mem_operand(i1), self.mem_operand(i2));

        if rel == TemporalRelation::Same {
            if !lp.contains_inst(program, i1) || !lp.contains_inst(program, i2) {
                return result;
            }
            let mut result = result;

            if let (true, Some(ptr)) = (program.is_store(i1), ptr1) {
                self.stats.eligible_forward_stores += 1;
                if self.pointer_killed_between(Some(lp), ptr, i1, i2, true, &budget) {
                    self.stats.killed_forward_stores += 1;
                    result = ModRefResult::NoModRef;
                }
            }
            if let (true, Some(ptr)) = (program.is_load(i2), ptr2) {
                self.stats.eligible_backward_loads += 1;
                if self.pointer_killed_between(Some(lp), ptr, i1, i2, true, &budget) {
                    self.stats.killed_backward_loads += 1;
                    result = ModRefResult::NoModRef;
                }
            }
            if let (true, Some(ptr)) = (program.is_load(i1), ptr1) {
                self.stats.eligible_forward_loads += 1;
                if self.pointer_killed_between(Some(lp), ptr, i1, i2, true, &budget) {
                    self.stats.killed_forward_loads += 1;
                    result = ModRefResult::NoModRef;
                }
            }
            if let (true, Some(ptr)) = (program.is_store(i2), ptr2) {
                self.stats.eligible_backward_stores += 1;
                if self.pointer_killed_between(Some(lp), ptr, i1, i2, true, &budget) {
                    self.stats.killed_backward_stores += 1;
                    result = ModRefResult::NoModRef;
                }
            }
            return result;
        }

        let (earlier, later, earlier_ptr, later_ptr) = match rel {
            TemporalRelation::After => (i2, i1, ptr2, ptr1),
            _ => (i1, i2, ptr1, ptr2),
        };
        let mut result = result;

        // Backward: a definite write earlier in the later operation's iteration hides every
        // value from previous iterations.
        if lp.contains_inst(program, later) {
            if let (true, Some(ptr)) = (program.is_load(later), later_ptr) {
                self.stats.eligible_backward_loads += 1;
                if self.pointer_killed_before(Some(lp), ptr, later, true, &budget) {
                    self.stats.killed_backward_loads += 1;
                    result = ModRefResult::NoModRef;
                }
            }
            if let (true, Some(ptr)) = (program.is_store(later), later_ptr) {
                self.stats.eligible_backward_stores += 1;
                if self.pointer_killed_before(Some(lp), ptr, later, true, &budget) {
                    self.stats.killed_backward_stores += 1;
                    result = ModRefResult::NoModRef;
                }
            }
        }
        if matches!(result, ModRefResult::NoModRef | ModRefResult::Ref) {
            return result;
        }

        // Forward: a definite write later in the earlier operation's iteration hides its effect
        // from every following iteration.
        if lp.contains_inst(program, earlier) {
            if let (true, Some(ptr)) = (program.is_store(earlier), earlier_ptr) {
                self.stats.eligible_forward_stores += 1;
                if self.pointer_killed_after(Some(lp), ptr, earlier, true, &budget) {
                    self.stats.killed_forward_stores += 1;
                    return ModRefResult::NoModRef;
                }
            }
            if let (true, Some(ptr)) = (program.is_load(earlier), earlier_ptr) {
                self.stats.eligible_forward_loads += 1;
                if self.pointer_killed_after(Some(lp), ptr, earlier, true, &budget) {
                    self.stats.killed_forward_loads += 1;
                    return ModRefResult::NoModRef;
                }
            }
        }

        debug!(
            first = %program.inst_label(i1),
            second = %program.inst_label(i2),
            %rel,
            %result,
            "no kill found"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killflow_core::ProgramBuilder;

    #[test]
    fn test_scan_range_bounds() {
        let mut builder = ProgramBuilder::new();
        let g = builder.global("g", None, false).unwrap();
        let mut func = builder.define("f", &[]).unwrap();
        let entry = func.block("entry");
        let first = func.store(Value::Const(1), g);
        let second = func.store(Value::Const(2), g);
        let third = func.store(Value::Const(3), g);
        let ret = func.ret(None);
        let program = builder.finish().unwrap();

        assert_eq!(scan_range(&program, entry, None, None).len(), 4);
        assert_eq!(scan_range(&program, entry, Some(first), Some(third)), &[second]);
        assert_eq!(scan_range(&program, entry, Some(third), None), &[ret]);
        assert!(scan_range(&program, entry, Some(third), Some(first)).is_empty());
        assert!(scan_range(&program, entry, Some(first), Some(second)).is_empty());
    }

    #[test]
    fn test_addresses_start_of() {
        let mut builder = ProgramBuilder::new();
        let mut func = builder.define("f", &["i"]).unwrap();
        func.block("entry");
        let i = func.param(0);
        let a = func.alloca(Some(Value::Const(4)));
        let zero = func.element_ptr(a, vec![Value::Const(0)]);
        let cast = func.cast(zero);
        let var = func.element_ptr(a, vec![i]);
        func.ret(None);
        let program = builder.finish().unwrap();

        assert!(addresses_start_of(&program, a, a));
        assert!(addresses_start_of(&program, cast, a));
        assert!(!addresses_start_of(&program, var, a));
    }
}
