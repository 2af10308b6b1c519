use crate::budget::QueryBudget;
use crate::context::{Context, KillDirection};
use crate::oracle::KillProver;
use crate::purity::PurityOracle;
use indexmap::IndexSet;
use killflow_core::{InstId, InstKind, Intrinsic, Program, Value};
use std::fmt;

/// An instruction observed under a calling context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CtxInst {
    pub inst: InstId,
    pub ctx: Context,
}

/// Something an operation may read or write, as seen by the loop being analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryObject {
    Value(Value),
    /// Hidden process state touched by semi-local library calls.
    Io,
}

/// Objects an operation reads and writes beyond its own activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    pub reads: IndexSet<MemoryObject>,
    pub writes: IndexSet<MemoryObject>,
    /// False when the operation may touch memory these sets do not name.
    pub complete: bool,
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            reads: IndexSet::new(),
            writes: IndexSet::new(),
            complete: true,
        }
    }
}

impl Footprint {
    pub fn incomplete() -> Self {
        Self {
            complete: false,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.complete && self.reads.is_empty() && self.writes.is_empty()
    }
}

impl CtxInst {
    pub fn new(inst: InstId, ctx: Context) -> Self {
        Self { inst, ctx }
    }

    pub fn root(inst: InstId) -> Self {
        Self::new(inst, Context::root())
    }

    /// The instruction of the outermost function under which this one executes.
    pub fn toplevel_inst(&self) -> InstId {
        self.ctx.toplevel_inst(self.inst)
    }

    /// A store is live-out unless its context overwrites the stored location afterwards.
    pub fn is_live_out<'p>(&self, kill: &mut dyn KillProver<'p>, budget: &QueryBudget) -> bool {
        let program = kill.program();
        match program.kind(self.inst) {
            InstKind::Store { ptr, .. } => {
                !self
                    .ctx
                    .kills(kill, *ptr, self.inst, KillDirection::After, true, budget)
            }
            _ => true,
        }
    }

    /// A load is live-in unless its context overwrites the loaded location beforehand.
    pub fn is_live_in<'p>(&self, kill: &mut dyn KillProver<'p>, budget: &QueryBudget) -> bool {
        let program = kill.program();
        match program.kind(self.inst) {
            InstKind::Load { ptr } => {
                !self
                    .ctx
                    .kills(kill, *ptr, self.inst, KillDirection::Before, true, budget)
            }
            _ => true,
        }
    }

    /// Objects this operation reads and writes that outlive its context.
    ///
    /// Only memory operations and calls have a footprint; asking for one of anything else is a
    /// logic error in the caller.
    pub fn non_local_footprint<'p>(
        &self,
        kill: &mut dyn KillProver<'p>,
        purity: &dyn PurityOracle,
        budget: &QueryBudget,
    ) -> Footprint {
        let program = kill.program();
        let mut footprint = Footprint::default();

        match program.kind(self.inst) {
            InstKind::Load { ptr } => {
                self.collect(kill, *ptr, KillDirection::Before, budget, &mut footprint.reads);
            }
            InstKind::Store { ptr, .. } => {
                self.collect(kill, *ptr, KillDirection::After, budget, &mut footprint.writes);
            }
            InstKind::Intrinsic(Intrinsic::MemCopy { dst, src, .. })
            | InstKind::Intrinsic(Intrinsic::MemMove { dst, src, .. }) => {
                self.collect(kill, *src, KillDirection::Before, budget, &mut footprint.reads);
                self.collect(kill, *dst, KillDirection::After, budget, &mut footprint.writes);
            }
            InstKind::Intrinsic(Intrinsic::MemSet { dst, .. }) => {
                self.collect(kill, *dst, KillDirection::After, budget, &mut footprint.writes);
            }
            InstKind::Intrinsic(_) => {}
            InstKind::Call { args, .. } => {
                let Some(func) = program.callee(self.inst) else {
                    return Footprint::incomplete();
                };
                if program.is_defined(func) {
                    return Footprint::incomplete();
                }

                if purity.is_semi_local(func) {
                    footprint.reads.insert(MemoryObject::Io);
                    footprint.writes.insert(MemoryObject::Io);
                } else if !purity.is_local(func) {
                    return Footprint::incomplete();
                }

                for (i, &arg) in args.iter().enumerate() {
                    if !is_pointer_candidate(program, arg) {
                        continue;
                    }
                    if !purity.write_only_formal_arg(func, i) {
                        self.collect(kill, arg, KillDirection::Before, budget, &mut footprint.reads);
                    }
                    if !purity.is_read_only(func) && !purity.read_only_formal_arg(func, i) {
                        self.collect(kill, arg, KillDirection::After, budget, &mut footprint.writes);
                    }
                }
            }
            other => panic!(
                "footprint requested for non-memory operation {} ({:?})",
                program.inst_label(self.inst),
                other
            ),
        }

        footprint
    }

    fn collect<'p>(
        &self,
        kill: &mut dyn KillProver<'p>,
        ptr: Value,
        direction: KillDirection,
        budget: &QueryBudget,
        into: &mut IndexSet<MemoryObject>,
    ) {
        let mut objects = IndexSet::new();
        self.ctx
            .underlying_objects(kill, ptr, self.inst, direction, budget, &mut objects);
        into.extend(objects.into_iter().map(MemoryObject::Value));
    }

    pub fn display<'a>(&'a self, program: &'a Program) -> impl fmt::Display + 'a {
        CtxInstDisplay { inst: self, program }
    }
}

fn is_pointer_candidate(program: &Program, value: Value) -> bool {
    match value {
        Value::Const(_) | Value::Undef | Value::Func(_) => false,
        Value::Inst(inst) => !matches!(
            program.kind(inst),
            InstKind::Binary { .. } | InstKind::Compare { .. }
        ),
        Value::Param(..) | Value::Global(_) => true,
    }
}

struct CtxInstDisplay<'a> {
    inst: &'a CtxInst,
    program: &'a Program,
}

impl fmt::Display for CtxInstDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.inst_label(self.inst.inst))?;
        if !self.inst.ctx.is_root() {
            write!(f, " in {}", self.inst.ctx.display(self.program))?;
        }
        Ok(())
    }
}
