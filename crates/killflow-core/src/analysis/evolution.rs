use super::loops::{Loop, LoopInfo};
use crate::block::Terminator;
use crate::entities::{BlockId, InstId};
use crate::instructions::{BinaryOp, ComparePred, InstKind};
use crate::program::Program;
use crate::values::Value;
use std::collections::HashMap;

/// `{start, +, step}` over the iterations of the loop headed by `header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddRec {
    pub start: Value,
    pub step: i64,
    pub header: BlockId,
}

impl AddRec {
    /// `{0, +, 1}`: counts iterations.
    pub fn is_canonical(&self) -> bool {
        self.start == Value::Const(0) && self.step == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evolution {
    Constant(i64),
    AddRec(AddRec),
    Unknown,
}

/// How many times the body of a loop runs per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCount {
    Constant(u64),
    /// Exactly the runtime value of this loop-invariant operand.
    Value(Value),
}

/// Affine induction variables and trip counts for the loops of one function.
///
/// Only the shapes that show up in counted loops are recognised: a header phi stepped by a
/// constant from the latch, and an exit test in the header comparing it against a loop-invariant
/// bound.
#[derive(Debug, Clone, Default)]
pub struct ScalarEvolution {
    inductions: HashMap<InstId, AddRec>,
    trip_counts: HashMap<BlockId, TripCount>,
}

impl ScalarEvolution {
    pub fn build(program: &Program, loops: &LoopInfo) -> Self {
        let mut evolution = Self::default();

        for l in loops.iter() {
            for &inst in &program.block(l.header).insts {
                if let Some(rec) = Self::induction_phi(program, l, inst) {
                    evolution.inductions.insert(inst, rec);
                }
            }
        }

        for l in loops.iter() {
            if let Some(count) = evolution.compute_trip_count(program, l) {
                evolution.trip_counts.insert(l.header, count);
            }
        }

        evolution
    }

    fn induction_phi(program: &Program, l: &Loop, inst: InstId) -> Option<AddRec> {
        let InstKind::Phi { incoming } = program.kind(inst) else {
            return None;
        };
        let [(b0, v0), (b1, v1)] = incoming.as_slice() else {
            return None;
        };

        let (start, next) = match (l.contains_block(*b0), l.contains_block(*b1)) {
            (false, true) => (*v0, *v1),
            (true, false) => (*v1, *v0),
            _ => return None,
        };

        let me = Value::Inst(inst);
        let step = match program.kind(next.as_inst()?) {
            InstKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } if *lhs == me => rhs.as_const()?,
            InstKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } if *rhs == me => lhs.as_const()?,
            InstKind::Binary {
                op: BinaryOp::Sub,
                lhs,
                rhs,
            } if *lhs == me => rhs.as_const()?.checked_neg()?,
            _ => return None,
        };

        (step != 0).then_some(AddRec {
            start,
            step,
            header: l.header,
        })
    }

    fn compute_trip_count(&self, program: &Program, l: &Loop) -> Option<TripCount> {
        let Some(Terminator::Branch {
            cond,
            then_block,
            else_block,
        }) = program.terminator_kind(l.header)
        else {
            return None;
        };

        let InstKind::Compare { pred, lhs, rhs } = program.kind(cond.as_inst()?) else {
            return None;
        };

        let continue_pred = match (l.contains_block(*then_block), l.contains_block(*else_block)) {
            (true, false) => *pred,
            (false, true) => pred.inverse(),
            _ => return None,
        };

        let (iv, bound, continue_pred) = match (self.induction_of(*lhs, l), self.induction_of(*rhs, l)) {
            (Some(rec), None) => (rec, *rhs, continue_pred),
            (None, Some(rec)) => (rec, *lhs, mirror(continue_pred)),
            _ => return None,
        };

        if !is_loop_invariant(program, l, bound) {
            return None;
        }

        match (iv.start.as_const(), bound.as_const()) {
            (Some(start), Some(end)) => {
                constant_trip_count(start, iv.step, continue_pred, end).map(TripCount::Constant)
            }
            (Some(0), None)
                if iv.step == 1
                    && matches!(
                        continue_pred,
                        ComparePred::Slt | ComparePred::Ult | ComparePred::Ne
                    ) =>
            {
                Some(TripCount::Value(bound))
            }
            _ => None,
        }
    }

    fn induction_of(&self, value: Value, l: &Loop) -> Option<AddRec> {
        self.inductions
            .get(&value.as_inst()?)
            .filter(|rec| rec.header == l.header)
            .copied()
    }

    pub fn induction(&self, phi: InstId) -> Option<&AddRec> {
        self.inductions.get(&phi)
    }

    pub fn trip_count(&self, header: BlockId) -> Option<TripCount> {
        self.trip_counts.get(&header).copied()
    }

    pub fn evolution_of(&self, program: &Program, value: Value) -> Evolution {
        match value {
            Value::Const(c) => Evolution::Constant(c),
            Value::Inst(inst) => {
                if let Some(rec) = self.inductions.get(&inst) {
                    return Evolution::AddRec(*rec);
                }
                match program.kind(inst) {
                    InstKind::Cast { value } => self.evolution_of(program, *value),
                    InstKind::Binary { op, lhs, rhs } => {
                        let (base, offset) = match (op, rhs.as_const(), lhs.as_const()) {
                            (BinaryOp::Add, Some(c), _) => (*lhs, c),
                            (BinaryOp::Add, None, Some(c)) => (*rhs, c),
                            (BinaryOp::Sub, Some(c), _) => match c.checked_neg() {
                                Some(neg) => (*lhs, neg),
                                None => return Evolution::Unknown,
                            },
                            _ => return Evolution::Unknown,
                        };
                        match self.evolution_of(program, base) {
                            Evolution::Constant(c) => c
                                .checked_add(offset)
                                .map_or(Evolution::Unknown, Evolution::Constant),
                            Evolution::AddRec(rec) => match rec.start.as_const() {
                                Some(s) => s.checked_add(offset).map_or(Evolution::Unknown, |s| {
                                    Evolution::AddRec(AddRec {
                                        start: Value::Const(s),
                                        ..rec
                                    })
                                }),
                                None => Evolution::Unknown,
                            },
                            Evolution::Unknown => Evolution::Unknown,
                        }
                    }
                    _ => Evolution::Unknown,
                }
            }
            _ => Evolution::Unknown,
        }
    }
}

fn mirror(pred: ComparePred) -> ComparePred {
    match pred {
        ComparePred::Slt => ComparePred::Sgt,
        ComparePred::Sle => ComparePred::Sge,
        ComparePred::Sgt => ComparePred::Slt,
        ComparePred::Sge => ComparePred::Sle,
        ComparePred::Ult => ComparePred::Ugt,
        ComparePred::Ule => ComparePred::Uge,
        ComparePred::Ugt => ComparePred::Ult,
        ComparePred::Uge => ComparePred::Ule,
        other => other,
    }
}

fn is_loop_invariant(program: &Program, l: &Loop, value: Value) -> bool {
    match value {
        Value::Inst(inst) => !l.contains_inst(program, inst),
        Value::Undef => false,
        _ => true,
    }
}

/// Iterations of `for (i = start; i PRED end; i += step)`.
fn constant_trip_count(start: i64, step: i64, pred: ComparePred, end: i64) -> Option<u64> {
    let (start, step, end) = (start as i128, step as i128, end as i128);
    let count = match pred {
        ComparePred::Slt | ComparePred::Ult if step > 0 => {
            if end > start {
                (end - start + step - 1) / step
            } else {
                0
            }
        }
        ComparePred::Sle | ComparePred::Ule if step > 0 => {
            if end >= start {
                (end - start) / step + 1
            } else {
                0
            }
        }
        ComparePred::Sgt | ComparePred::Ugt if step < 0 => {
            if start > end {
                (start - end + (-step) - 1) / (-step)
            } else {
                0
            }
        }
        ComparePred::Sge | ComparePred::Uge if step < 0 => {
            if start >= end {
                (start - end) / (-step) + 1
            } else {
                0
            }
        }
        ComparePred::Ne if step == 1 && end >= start => end - start,
        ComparePred::Ne if step == -1 && start >= end => start - end,
        _ => return None,
    };
    u64::try_from(count).ok()
}
