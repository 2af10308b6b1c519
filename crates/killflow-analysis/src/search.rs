use crate::budget::QueryBudget;
use crate::context::Context;
use crate::ctx_inst::CtxInst;
use crate::oracle::KillProver;
use killflow_core::{
    BlockId, DominanceProvider, FuncId, InstId, InstKind, Intrinsic, Program, Terminator,
};
use std::collections::HashSet;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchDirection {
    /// From a call site into its callees, in dominator-tree order. Finds live-in operations.
    Forward,
    /// From a call site's exits backwards, in post-dominator-tree order. Finds live-out
    /// operations.
    Reverse,
}

/// Which kinds of memory access make an operation a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessFilter {
    pub reads: bool,
    pub writes: bool,
}

impl AccessFilter {
    pub const LOADS: Self = Self {
        reads: true,
        writes: false,
    };
    pub const STORES: Self = Self {
        reads: false,
        writes: true,
    };
    pub const ALL: Self = Self {
        reads: true,
        writes: true,
    };

    fn may_read(&self, program: &Program, inst: InstId) -> bool {
        self.reads && program.may_read_memory(inst) && !is_benign(program, inst)
    }

    fn may_write(&self, program: &Program, inst: InstId) -> bool {
        self.writes && program.may_write_memory(inst) && !is_benign(program, inst)
    }

    fn admits(&self, program: &Program, inst: InstId) -> bool {
        self.may_read(program, inst) || self.may_write(program, inst)
    }
}

/// Intrinsics that never carry a value from one operation to another.
fn is_benign(program: &Program, inst: InstId) -> bool {
    match program.kind(inst) {
        InstKind::Intrinsic(intrinsic) => {
            intrinsic.is_lifetime_marker() || matches!(intrinsic, Intrinsic::Marker { .. })
        }
        _ => false,
    }
}

/// A lazy depth-first walk over the operations a starting instruction may perform, descending
/// into defined callees under deeper contexts.
///
/// Hits are produced on demand and kept in discovery order. The walk is single-use: once the
/// fringe is drained the search is done, and a fresh one must be built to walk again.
#[derive(Debug, Clone)]
pub struct InstSearch {
    direction: SearchDirection,
    filter: AccessFilter,
    fringe: Vec<CtxInst>,
    visited: HashSet<InstId>,
    hits: Vec<CtxInst>,
}

impl InstSearch {
    /// Classifies `start` and seeds the fringe from it. The start itself may be the first hit;
    /// its successors are not expanded.
    pub fn new<'p>(
        direction: SearchDirection,
        filter: AccessFilter,
        start: InstId,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> Self {
        let mut search = Self {
            direction,
            filter,
            fringe: Vec::new(),
            visited: HashSet::new(),
            hits: Vec::new(),
        };
        search.is_goal_state(CtxInst::root(start), kill, budget);
        search
    }

    /// Loads that may observe a value from before `start`, within it or its callees.
    pub fn forward_loads<'p>(
        start: InstId,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> Self {
        Self::new(SearchDirection::Forward, AccessFilter::LOADS, start, kill, budget)
    }

    pub fn forward_stores<'p>(
        start: InstId,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> Self {
        Self::new(SearchDirection::Forward, AccessFilter::STORES, start, kill, budget)
    }

    pub fn reverse_loads<'p>(
        start: InstId,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> Self {
        Self::new(SearchDirection::Reverse, AccessFilter::LOADS, start, kill, budget)
    }

    /// Stores whose value may survive past `start`, within it or its callees.
    pub fn reverse_stores<'p>(
        start: InstId,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> Self {
        Self::new(SearchDirection::Reverse, AccessFilter::STORES, start, kill, budget)
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    pub fn is_done(&self) -> bool {
        self.fringe.is_empty()
    }

    pub fn num_hits(&self) -> usize {
        self.hits.len()
    }

    pub fn hit(&self, n: usize) -> Option<&CtxInst> {
        self.hits.get(n)
    }

    pub fn hits(&self) -> &[CtxInst] {
        &self.hits
    }

    /// Walks until one more hit is found or the fringe is exhausted. Returns whether a hit was
    /// added.
    pub fn try_get_more_hits<'p>(
        &mut self,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> bool {
        let dominance = kill.dominance();
        while let Some(node) = self.fringe.pop() {
            let found = self.is_goal_state(node.clone(), kill, budget);
            self.expand(&node, kill.program(), dominance);
            if found {
                return true;
            }
        }
        false
    }

    /// Pulls until hit `n` exists. Returns false when the search ends first.
    pub fn fetch<'p>(
        &mut self,
        n: usize,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> bool {
        while self.hits.len() <= n {
            if self.is_done() {
                return false;
            }
            self.try_get_more_hits(kill, budget);
        }
        true
    }

    pub fn collect_all<'p>(
        &mut self,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> &[CtxInst] {
        while !self.is_done() {
            self.try_get_more_hits(kill, budget);
        }
        &self.hits
    }

    fn is_goal_state<'p>(
        &mut self,
        node: CtxInst,
        kill: &mut dyn KillProver<'p>,
        budget: &QueryBudget,
    ) -> bool {
        let program = kill.program();
        let inst = node.inst;

        if let Some(callee) = program.callee(inst) {
            if program.is_defined(callee) && self.visited.insert(inst) {
                let ctx = node.ctx.sub_context(inst);
                match self.direction {
                    SearchDirection::Forward => {
                        let entry = program
                            .function(callee)
                            .entry_block()
                            .and_then(|b| program.first_inst(b));
                        if let Some(first) = entry {
                            self.fringe.push(CtxInst::new(first, ctx));
                        }
                    }
                    SearchDirection::Reverse => {
                        self.expand_roots(callee, ctx, program, kill.dominance());
                    }
                }
                trace!(call = %program.inst_label(inst), "descending into callee");
                return false;
            }
        }

        if !self.filter.admits(program, inst) {
            return false;
        }

        let live = match self.direction {
            SearchDirection::Forward => node.is_live_in(kill, budget),
            SearchDirection::Reverse => node.is_live_out(kill, budget),
        };
        if !live {
            trace!(inst = %node.display(program), "hit is dead at the search boundary");
            return false;
        }

        trace!(inst = %node.display(program), "search hit");
        self.hits.push(node);
        true
    }

    fn expand(&mut self, node: &CtxInst, program: &Program, dominance: &dyn DominanceProvider) {
        let inst = node.inst;
        let block = program.block_of(inst);
        let func = program.function_of(inst);

        match self.direction {
            SearchDirection::Forward => match program.next_inst(inst) {
                Some(next) => self.fringe.push(CtxInst::new(next, node.ctx.clone())),
                None => {
                    let Some(dt) = dominance.dominator_tree(func) else {
                        return;
                    };
                    for &child in dt.children(block) {
                        if let Some(first) = program.first_inst(child) {
                            self.fringe.push(CtxInst::new(first, node.ctx.clone()));
                        }
                    }
                }
            },
            SearchDirection::Reverse => match program.prev_inst(inst) {
                Some(prev) => self.fringe.push(CtxInst::new(prev, node.ctx.clone())),
                None => {
                    let Some(pdt) = dominance.post_dominator_tree(func) else {
                        return;
                    };
                    for &child in pdt.children(block) {
                        self.push_exit(child, &node.ctx, program);
                    }
                }
            },
        }
    }

    /// Seeds a reverse walk at the exits of `callee`: the post-dominator root when there is a
    /// single one, otherwise every top-level block under the virtual root.
    fn expand_roots(
        &mut self,
        callee: FuncId,
        ctx: Context,
        program: &Program,
        dominance: &dyn DominanceProvider,
    ) {
        let Some(pdt) = dominance.post_dominator_tree(callee) else {
            return;
        };
        match pdt.root() {
            Some(root) => self.push_exit(root, &ctx, program),
            None => {
                for &block in pdt.top_level() {
                    self.push_exit(block, &ctx, program);
                }
            }
        }
    }

    fn push_exit(&mut self, block: BlockId, ctx: &Context, program: &Program) {
        if matches!(program.terminator_kind(block), Some(Terminator::Unreachable)) {
            return;
        }
        if let Some(term) = program.terminator(block) {
            self.fringe.push(CtxInst::new(term, ctx.clone()));
        }
    }
}
