use crate::budget::QueryBudget;
use crate::config::AnalysisConfig;
use crate::context::KillDirection;
use crate::ctx_inst::CtxInst;
use crate::introspection::{narrate, Introspection};
use crate::kill_flow::KillFlow;
use crate::oracle::{AliasOracle, AliasResult, KillProver, ModRefResult, TemporalRelation};
use crate::search::InstSearch;
use crate::stats::CombinatorStats;
use indexmap::IndexSet;
use killflow_core::{BlockId, DominanceProvider, InstId, InstKind, Loop, Program, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A write and a read whose flow through memory could not be disproved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flow {
    pub write: CtxInst,
    pub read: CtxInst,
}

/// Which pair of kill tests applies to a candidate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Iteration {
    /// The write happens in an earlier iteration than the read.
    Cross,
    /// Both happen in one iteration, the write first.
    Intra,
}

/// Top of the oracle stack: disproves loop-carried flows between call sites by searching inside
/// the callees.
///
/// For a call `src` in one iteration and an operation `dst` in a later one, the stores that may
/// survive `src` are paired with the loads that may observe memory at `dst`. A flow exists only if
/// some pair survives every kill test. Verdicts are cached per `(src, dst, loop)`.
pub struct CallsiteDepthCombinator<'p> {
    kill: KillFlow<'p>,
    cache: HashMap<(InstId, InstId, BlockId), bool>,
    introspection: Introspection,
    stats: CombinatorStats,
}

impl<'p> CallsiteDepthCombinator<'p> {
    pub fn new(kill: KillFlow<'p>) -> Self {
        let introspection = Introspection::new(kill.config().watch.clone());
        Self {
            kill,
            cache: HashMap::new(),
            introspection,
            stats: CombinatorStats::default(),
        }
    }

    pub fn with_basic_oracle(
        program: &'p Program,
        dominance: &'p dyn DominanceProvider,
        config: AnalysisConfig,
    ) -> Self {
        Self::new(KillFlow::with_basic_oracle(program, dominance, config))
    }

    pub fn kill_flow(&self) -> &KillFlow<'p> {
        &self.kill
    }

    pub fn kill_flow_mut(&mut self) -> &mut KillFlow<'p> {
        &mut self.kill
    }

    pub fn stats(&self) -> &CombinatorStats {
        &self.stats
    }

    pub fn program(&self) -> &'p Program {
        self.kill.program()
    }

    /// Drops the verdict cache and every kill summary beneath it.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.kill.invalidate();
    }

    /// Only calls into defined functions have anything to search.
    pub fn is_eligible(&self, inst: InstId) -> bool {
        let program = self.program();
        program
            .callee(inst)
            .map_or(false, |callee| program.is_defined(callee))
    }

    /// Whether `write`, executed in some iteration, may deliver a value to `read` in a later one.
    pub fn may_flow_cross_iter(
        &mut self,
        write: &CtxInst,
        read: &CtxInst,
        lp: &Loop,
        budget: &QueryBudget,
    ) -> bool {
        self.may_flow(write, read, lp, Iteration::Cross, budget)
    }

    /// Whether `write` may deliver a value to `read` later in the same iteration.
    pub fn may_flow_intra_iter(
        &mut self,
        write: &CtxInst,
        read: &CtxInst,
        lp: &Loop,
        budget: &QueryBudget,
    ) -> bool {
        self.may_flow(write, read, lp, Iteration::Intra, budget)
    }

    /// Pairs every live-out store of `src` with every live-in load of `dst`. Returns whether some
    /// pair may flow across the back edge; with `all_flows`, every such pair is collected instead
    /// of stopping at the first.
    pub fn do_flow_search_cross_iter(
        &mut self,
        src: InstId,
        dst: InstId,
        lp: &Loop,
        all_flows: Option<&mut Vec<Flow>>,
        budget: &QueryBudget,
    ) -> bool {
        self.flow_search(src, dst, lp, Iteration::Cross, all_flows, budget)
    }

    pub fn do_flow_search_intra_iter(
        &mut self,
        src: InstId,
        dst: InstId,
        lp: &Loop,
        all_flows: Option<&mut Vec<Flow>>,
        budget: &QueryBudget,
    ) -> bool {
        self.flow_search(src, dst, lp, Iteration::Intra, all_flows, budget)
    }

    /// Every surviving cross-iteration flow from `src` to `dst`.
    pub fn all_flows_cross_iter(&mut self, src: InstId, dst: InstId, lp: &Loop) -> Vec<Flow> {
        let budget = QueryBudget::from_config(self.kill.config());
        let mut flows = Vec::new();
        self.do_flow_search_cross_iter(src, dst, lp, Some(&mut flows), &budget);
        flows
    }

    fn flow_search(
        &mut self,
        src: InstId,
        dst: InstId,
        lp: &Loop,
        iteration: Iteration,
        mut all_flows: Option<&mut Vec<Flow>>,
        budget: &QueryBudget,
    ) -> bool {
        let program = self.program();
        let mut is_flow = false;

        let mut writes = InstSearch::reverse_stores(src, &mut self.kill, budget);
        let mut reads = InstSearch::forward_loads(dst, &mut self.kill, budget);

        let mut i = 0;
        'writes: while writes.fetch(i, &mut self.kill, budget) {
            let Some(write) = writes.hit(i).cloned() else {
                break;
            };

            let mut j = 0;
            while reads.fetch(j, &mut self.kill, budget) {
                let Some(read) = reads.hit(j).cloned() else {
                    break;
                };
                j += 1;

                if budget.expired() {
                    self.stats.timeouts += 1;
                    warn!(
                        src = %program.inst_label(src),
                        dst = %program.inst_label(dst),
                        elapsed = ?budget.elapsed(),
                        "flow search timed out; assuming a flow"
                    );
                    return true;
                }

                if !self.may_flow(&write, &read, lp, iteration, budget) {
                    continue;
                }

                debug!(
                    write = %write.display(program),
                    read = %read.display(program),
                    "cannot disprove flow"
                );
                is_flow = true;
                match all_flows.as_deref_mut() {
                    Some(flows) => flows.push(Flow {
                        write: write.clone(),
                        read,
                    }),
                    None => break 'writes,
                }
            }
            i += 1;
        }

        is_flow
    }

    fn may_flow(
        &mut self,
        write: &CtxInst,
        read: &CtxInst,
        lp: &Loop,
        iteration: Iteration,
        budget: &QueryBudget,
    ) -> bool {
        self.stats.flow_tests += 1;
        let program = self.program();
        let (src, dst) = (write.toplevel_inst(), read.toplevel_inst());
        let rel = match iteration {
            Iteration::Cross => TemporalRelation::Before,
            Iteration::Intra => TemporalRelation::Same,
        };

        let q = self.kill.modref(write.inst, rel, read.inst, Some(lp));
        narrate!(
            self.introspection,
            write = %write.display(program),
            read = %read.display(program),
            result = %q,
            "testing flow"
        );
        if matches!(q, ModRefResult::NoModRef | ModRefResult::Ref) {
            self.stats.disproved_by_modref += 1;
            return false;
        }

        if let InstKind::Store { ptr, .. } = program.kind(write.inst) {
            let ptr = *ptr;
            match iteration {
                Iteration::Cross => {
                    if self.kill.pointer_killed_after(Some(lp), ptr, src, true, budget) {
                        self.stats.killed_store_after_src += 1;
                        return false;
                    }
                    if self.kill.pointer_killed_before(Some(lp), ptr, dst, true, budget) {
                        self.stats.killed_store_before_dst += 1;
                        return false;
                    }
                }
                Iteration::Intra => {
                    if self.kill.pointer_killed_between(Some(lp), ptr, src, dst, true, budget) {
                        self.stats.killed_store_between += 1;
                        return false;
                    }
                }
            }
            if read.ctx.kills(
                &mut self.kill,
                ptr,
                read.inst,
                KillDirection::Before,
                false,
                budget,
            ) {
                self.stats.killed_store_in_load_ctx += 1;
                return false;
            }
        }

        if let InstKind::Load { ptr } = program.kind(read.inst) {
            let ptr = *ptr;
            match iteration {
                Iteration::Cross => {
                    if self.kill.pointer_killed_before(Some(lp), ptr, dst, true, budget) {
                        self.stats.killed_load_before_dst += 1;
                        return false;
                    }
                    if self.kill.pointer_killed_after(Some(lp), ptr, src, true, budget) {
                        self.stats.killed_load_after_src += 1;
                        return false;
                    }
                }
                Iteration::Intra => {
                    if self.kill.pointer_killed_between(Some(lp), ptr, src, dst, true, budget) {
                        self.stats.killed_load_between += 1;
                        return false;
                    }
                }
            }
            if write.ctx.kills(
                &mut self.kill,
                ptr,
                write.inst,
                KillDirection::After,
                false,
                budget,
            ) {
                self.stats.killed_load_in_store_ctx += 1;
                return false;
            }
        }

        if let InstKind::Store { ptr, .. } = program.kind(write.inst) {
            if self.objects_killed(write, *ptr, KillDirection::After, src, dst, lp, iteration, budget) {
                self.stats.killed_aggregate_store += 1;
                return false;
            }
        }

        if let InstKind::Load { ptr } = program.kind(read.inst) {
            if self.objects_killed(read, *ptr, KillDirection::Before, src, dst, lp, iteration, budget) {
                self.stats.killed_aggregate_load += 1;
                return false;
            }
        }

        narrate!(self.introspection, "every kill test failed");
        true
    }

    /// Whether every object `ptr` may name, as seen from the loop, is overwritten between `src`
    /// and `dst`.
    #[allow(clippy::too_many_arguments)]
    fn objects_killed(
        &mut self,
        at: &CtxInst,
        ptr: Value,
        direction: KillDirection,
        src: InstId,
        dst: InstId,
        lp: &Loop,
        iteration: Iteration,
        budget: &QueryBudget,
    ) -> bool {
        let mut objects = IndexSet::new();
        at.ctx
            .underlying_objects(&mut self.kill, ptr, at.inst, direction, budget, &mut objects);

        objects.into_iter().all(|object| match iteration {
            Iteration::Cross => {
                self.kill.aggregate_killed_after(Some(lp), object, src, budget)
                    || self.kill.aggregate_killed_before(Some(lp), object, dst, budget)
            }
            Iteration::Intra => self
                .kill
                .aggregate_killed_between(Some(lp), object, src, dst, budget),
        })
    }

    fn cross_iteration_query(
        &mut self,
        i1: InstId,
        rel: TemporalRelation,
        i2: InstId,
        lp: &Loop,
        mut result: ModRefResult,
    ) -> ModRefResult {
        let program = self.program();
        if !program.may_read_memory(i1) {
            result = result.without_ref();
        }
        if !program.may_write_memory(i1) {
            return result.without_mod();
        }

        let (src, dst) = match rel {
            TemporalRelation::After => (i2, i1),
            _ => (i1, i2),
        };
        if !program.may_write_memory(src) || !program.may_read_memory(dst) {
            return result;
        }

        narrate!(
            self.introspection,
            first = %program.inst_label(i1),
            second = %program.inst_label(i2),
            %rel,
            %result,
            "combinator query"
        );
        self.stats.eligible += 1;

        let key = (src, dst, lp.header);
        let is_flow = match self.cache.get(&key) {
            Some(&cached) => {
                self.stats.cache_hits += 1;
                cached
            }
            None => {
                let budget = QueryBudget::from_config(self.kill.config());
                let is_flow = self.do_flow_search_cross_iter(src, dst, lp, None, &budget);
                if !budget.expired() {
                    self.cache.insert(key, is_flow);
                }
                is_flow
            }
        };

        if !is_flow {
            debug!(
                src = %program.inst_label(src),
                dst = %program.inst_label(dst),
                "no loop-carried flow"
            );
            result = match rel {
                TemporalRelation::Before => result.without_mod(),
                TemporalRelation::After => result.without_ref(),
                TemporalRelation::Same => result,
            };
        }

        narrate!(self.introspection, %result, "combinator answer");
        result
    }
}

impl AliasOracle for CallsiteDepthCombinator<'_> {
    fn name(&self) -> &'static str {
        "callsite-depth-combinator"
    }

    fn alias(&mut self, p1: Value, p2: Value) -> AliasResult {
        self.kill.alias(p1, p2)
    }

    fn modref(
        &mut self,
        i1: InstId,
        rel: TemporalRelation,
        i2: InstId,
        lp: Option<&Loop>,
    ) -> ModRefResult {
        let result = self.kill.modref(i1, rel, i2, lp);
        if matches!(result, ModRefResult::NoModRef | ModRefResult::Ref) {
            return result;
        }
        if rel == TemporalRelation::Same {
            return result;
        }
        let Some(lp) = lp else {
            return result;
        };

        let program = self.program();
        if !lp.contains_inst(program, i1) || !lp.contains_inst(program, i2) {
            return result;
        }
        if !self.is_eligible(i1) && !self.is_eligible(i2) {
            return result;
        }

        let entered = self.introspection.enter(program, i1, i2);
        let result = self.cross_iteration_query(i1, rel, i2, lp, result);
        self.introspection.exit(entered);
        result
    }
}
