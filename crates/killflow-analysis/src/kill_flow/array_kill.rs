/*! Whole-array overwrites by an inner counted loop.
 *
 * A loop like `for (i = 0; i < n; i++) a[i] = ...;` kills every element of `a` once it has run,
 * even though no single store must-alias an arbitrary `a[j]`. This is recognised when the inner
 * loop body always executes, the store address has the same shape as the queried one, and every
 * index either matches the queried index or sweeps the whole object.
 */

use super::KillFlow;
use killflow_core::analysis::objects::{is_identified_object, object_extent, Extent};
use killflow_core::analysis::{underlying_object, Evolution, TripCount};
use killflow_core::{
    BlockId, FuncId, GlobalId, InstId, InstKind, Loop, Program, Terminator, Value,
};
use tracing::debug;

impl<'p> KillFlow<'p> {
    /// Whether the loop headed by `header` overwrites the element `ptr` addresses.
    ///
    /// `None` means the question was not asked: the anchors sit inside that loop, so a kill in
    /// some iteration says nothing about this one. Such answers must not be cached.
    pub(super) fn array_overwrite(
        &mut self,
        header: BlockId,
        ptr: Value,
        after: Option<InstId>,
        before: Option<InstId>,
        outer: &Loop,
    ) -> Option<bool> {
        let program = self.program;
        let dominance = self.dominance;
        let func = program.block(header).func;
        let Some(inner) = dominance.loop_info(func).and_then(|info| info.get(header)) else {
            return Some(false);
        };

        let anchored_inside = |inst: Option<InstId>| inst.map_or(false, |i| inner.contains_inst(program, i));
        if anchored_inside(after) || anchored_inside(before) {
            return None;
        }
        if !inner.is_innermost() {
            return Some(false);
        }

        let Some(entry) = loop_entry(program, inner) else {
            return Some(false);
        };
        let Some(pdt) = dominance.post_dominator_tree(func) else {
            return Some(false);
        };
        if !inner.blocks.iter().all(|&b| pdt.dominates(b, entry)) {
            return Some(false);
        }

        let body: Vec<BlockId> = program
            .function(func)
            .blocks
            .iter()
            .copied()
            .filter(|b| inner.contains_block(*b))
            .collect();

        for block in body {
            for &inst in &program.block(block).insts {
                let InstKind::Store { ptr: stored, .. } = program.kind(inst) else {
                    continue;
                };
                let Some((kill_base, kill_indices)) = element_address(program, *stored) else {
                    continue;
                };
                let Some((base, indices)) = element_address(program, ptr) else {
                    return Some(false);
                };
                if indices.len() != kill_indices.len() || !self.alias_base_pointer(base, kill_base, outer) {
                    continue;
                }

                let covered = indices
                    .iter()
                    .zip(kill_indices)
                    .enumerate()
                    .all(|(position, (&index, &kill_index))| {
                        self.matching_idx(func, index, kill_index)
                            || (position == 0 && self.kill_all_idx(inner, kill_base, kill_index))
                    });
                if covered {
                    self.stats.array_overwrites += 1;
                    debug!(
                        ptr = %program.value_name(ptr),
                        by = %program.inst_label(inst),
                        header = %program.block(header).name,
                        "array overwritten by inner loop"
                    );
                    return Some(true);
                }
            }
        }
        Some(false)
    }

    /// Two element bases address the same object in the current iteration of `outer`.
    fn alias_base_pointer(&mut self, base: Value, kill_base: Value, outer: &Loop) -> bool {
        if base == kill_base || self.must_alias(kill_base, base) {
            return true;
        }

        // Both reload the same global inside the loop, and nothing in the loop stores to it.
        let program = self.program;
        match (loaded_global(program, base), loaded_global(program, kill_base)) {
            (Some((g1, l1)), Some((g2, l2))) if g1 == g2 => {
                outer.contains_inst(program, l1)
                    && outer.contains_inst(program, l2)
                    && !loop_writes_global(program, outer, g1)
            }
            _ => false,
        }
    }

    fn matching_idx(&mut self, func: FuncId, index: Value, kill_index: Value) -> bool {
        let program = self.program;
        let (index, kill_index) = (strip_casts(program, index), strip_casts(program, kill_index));
        if index == kill_index {
            return true;
        }

        let dominance = self.dominance;
        let Some(evolution) = dominance.evolution(func) else {
            return false;
        };
        match (
            evolution.evolution_of(program, index),
            evolution.evolution_of(program, kill_index),
        ) {
            (Evolution::Constant(a), Evolution::Constant(b)) => a == b,
            (Evolution::AddRec(query), Evolution::AddRec(kill)) => {
                if query.start != kill.start || query.step != kill.step {
                    return false;
                }
                match (
                    evolution.trip_count(query.header),
                    evolution.trip_count(kill.header),
                ) {
                    (Some(query_trip), Some(kill_trip)) => self.trip_covers(kill_trip, query_trip),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// The kill index sweeps `0..len` of an identified object over the inner loop.
    fn kill_all_idx(&mut self, inner: &Loop, kill_base: Value, kill_index: Value) -> bool {
        let program = self.program;
        let object = underlying_object(program, kill_base);
        if strip_casts(program, kill_base) != object || !is_identified_object(program, object) {
            return false;
        }

        let dominance = self.dominance;
        let Some(evolution) = dominance.evolution(inner.func) else {
            return false;
        };
        let Evolution::AddRec(rec) = evolution.evolution_of(program, kill_index) else {
            return false;
        };
        if !rec.is_canonical() || rec.header != inner.header {
            return false;
        }

        match (evolution.trip_count(inner.header), object_extent(program, object)) {
            (Some(TripCount::Constant(trips)), Some(Extent::Elements(len))) => trips >= len,
            (Some(TripCount::Value(trips)), Some(Extent::Dynamic(len))) => {
                self.same_quantity(trips, len)
            }
            _ => false,
        }
    }

    fn trip_covers(&mut self, kill: TripCount, query: TripCount) -> bool {
        match (kill, query) {
            (TripCount::Constant(k), TripCount::Constant(q)) => k >= q,
            (TripCount::Value(k), TripCount::Value(q)) => self.same_quantity(k, q),
            _ => false,
        }
    }

    /// Two operands provably hold the same number at runtime.
    pub(super) fn same_quantity(&mut self, a: Value, b: Value) -> bool {
        let program = self.program;
        let (a, b) = (strip_casts(program, a), strip_casts(program, b));
        if a == b {
            return true;
        }

        match (loaded_global(program, a), loaded_global(program, b)) {
            (Some((g1, l1)), Some((g2, l2)))
                if g1 == g2 && program.function_of(l1) == program.function_of(l2) =>
            {
                self.no_stores_between(l1, l2, g1)
            }
            _ => false,
        }
    }

    /// No instruction reachable from either load may write `global`, so both read the same value.
    fn no_stores_between(&mut self, first: InstId, second: InstId, global: GlobalId) -> bool {
        let key = (first.min(second), first.max(second), global);
        if let Some(&cached) = self.no_stores_between.get(&key) {
            return cached;
        }

        let program = self.program;
        let func = program.function_of(first);
        let dominance = self.dominance;
        let answer = match dominance.cfg(func) {
            Some(cfg) => {
                let mut reachable = cfg.reachable_from(program.block_of(first));
                reachable.extend(cfg.reachable_from(program.block_of(second)));
                !reachable.into_iter().any(|block| {
                    program
                        .block(block)
                        .insts
                        .iter()
                        .any(|&inst| may_write_global(program, inst, global))
                })
            }
            None => false,
        };

        self.no_stores_between.insert(key, answer);
        answer
    }
}

/// The block a loop's body starts at: the one in-loop successor of the header's branch.
fn loop_entry(program: &Program, lp: &Loop) -> Option<BlockId> {
    match program.terminator_kind(lp.header)? {
        Terminator::Branch {
            then_block,
            else_block,
            ..
        } => match (lp.contains_block(*then_block), lp.contains_block(*else_block)) {
            (true, false) => Some(*then_block),
            (false, true) => Some(*else_block),
            _ => None,
        },
        _ => None,
    }
}

fn strip_casts(program: &Program, mut value: Value) -> Value {
    while let Value::Inst(inst) = value {
        match program.kind(inst) {
            InstKind::Cast { value: inner } => value = *inner,
            _ => break,
        }
    }
    value
}

fn element_address(program: &Program, ptr: Value) -> Option<(Value, &[Value])> {
    let inst = strip_casts(program, ptr).as_inst()?;
    match program.kind(inst) {
        InstKind::ElementPtr { base, indices } => Some((strip_casts(program, *base), indices.as_slice())),
        _ => None,
    }
}

/// `load @g`, with the load.
fn loaded_global(program: &Program, value: Value) -> Option<(GlobalId, InstId)> {
    let inst = value.as_inst()?;
    match program.kind(inst) {
        InstKind::Load { ptr } => match strip_casts(program, *ptr) {
            Value::Global(g) => Some((g, inst)),
            _ => None,
        },
        _ => None,
    }
}

fn may_write_global(program: &Program, inst: InstId, global: GlobalId) -> bool {
    let hits = |ptr: Value| {
        let object = underlying_object(program, ptr);
        object == Value::Global(global) || !is_identified_object(program, object)
    };
    match program.kind(inst) {
        InstKind::Store { ptr, .. } => hits(*ptr),
        InstKind::Intrinsic(intrinsic) if intrinsic.is_mem_intrinsic() => {
            intrinsic.mem_dest().map_or(true, hits)
        }
        InstKind::Call { .. } => program.may_write_memory(inst),
        _ => false,
    }
}

fn loop_writes_global(program: &Program, lp: &Loop, global: GlobalId) -> bool {
    lp.blocks.iter().any(|&block| {
        program
            .block(block)
            .insts
            .iter()
            .any(|&inst| may_write_global(program, inst, global))
    })
}
