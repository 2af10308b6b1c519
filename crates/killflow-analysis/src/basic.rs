use crate::oracle::{AliasOracle, AliasResult, ModRefResult, TemporalRelation};
use crate::purity::{DeclarationPurity, PurityOracle};
use killflow_core::analysis::objects::{as_alloca, is_identified_object};
use killflow_core::analysis::underlying_objects;
use killflow_core::{InstId, InstKind, Intrinsic, Loop, Program, Value};
use tracing::trace;

/// Same-iteration alias facts derived from underlying objects and constant offsets.
///
/// This is the bottom of the stack: it knows nothing about loops beyond refusing to equate
/// per-iteration addresses when the relation is not `Same`.
pub struct BasicAliasOracle<'p> {
    program: &'p Program,
    purity: DeclarationPurity<'p>,
}

/// One pointer an instruction touches.
#[derive(Debug, Clone, Copy)]
struct Access {
    ptr: Value,
    reads: bool,
    writes: bool,
}

/// What an instruction touches, or `None` when it may touch anything.
type Accesses = Option<Vec<Access>>;

impl<'p> BasicAliasOracle<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            purity: DeclarationPurity::new(program),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    fn strip_casts(&self, mut value: Value) -> Value {
        while let Value::Inst(inst) = value {
            match self.program.kind(inst) {
                InstKind::Cast { value: inner } => value = *inner,
                _ => break,
            }
        }
        value
    }

    /// Splits a pointer into a base and its constant element offsets, if all are constant.
    fn decompose(&self, ptr: Value) -> (Value, Option<Vec<i64>>) {
        let ptr = self.strip_casts(ptr);
        if let Value::Inst(inst) = ptr {
            if let InstKind::ElementPtr { base, indices } = self.program.kind(inst) {
                let offsets = indices.iter().map(|i| i.as_const()).collect();
                return (self.strip_casts(*base), offsets);
            }
        }
        (ptr, Some(Vec::new()))
    }

    fn objects_disjoint(&self, p1: Value, p2: Value) -> bool {
        let objects1 = underlying_objects(self.program, p1);
        let objects2 = underlying_objects(self.program, p2);

        objects1.iter().all(|&a| {
            objects2
                .iter()
                .all(|&b| a != b && self.distinct_objects(a, b))
        })
    }

    fn distinct_objects(&self, a: Value, b: Value) -> bool {
        if is_identified_object(self.program, a) && is_identified_object(self.program, b) {
            return true;
        }
        // An argument was bound before any stack slot of its own activation existed.
        let param_vs_local = |param: Value, other: Value| match (param, as_alloca(self.program, other)) {
            (Value::Param(f, _), Some(slot)) => self.program.function_of(slot) == f,
            _ => false,
        };
        param_vs_local(a, b) || param_vs_local(b, a)
    }

    /// A base whose address is the same in every iteration of any loop.
    fn is_invariant_base(&self, base: Value) -> bool {
        match base {
            Value::Global(_) | Value::Param(..) => true,
            Value::Inst(inst) => {
                let entry = self.program.function(self.program.function_of(inst)).entry_block();
                as_alloca(self.program, base).is_some() && entry == Some(self.program.block_of(inst))
            }
            _ => false,
        }
    }

    fn alias_across(&self, p1: Value, p2: Value, rel: TemporalRelation) -> AliasResult {
        if self.objects_disjoint(p1, p2) {
            return AliasResult::NoAlias;
        }

        let (base1, offsets1) = self.decompose(p1);
        let (base2, offsets2) = self.decompose(p2);
        if base1 != base2 {
            return AliasResult::MayAlias;
        }
        if rel != TemporalRelation::Same && !self.is_invariant_base(base1) {
            return AliasResult::MayAlias;
        }

        match (offsets1, offsets2) {
            (Some(a), Some(b)) if trimmed(&a) == trimmed(&b) => {
                if rel == TemporalRelation::Same || self.is_invariant_base(base1) {
                    AliasResult::MustAlias
                } else {
                    AliasResult::MayAlias
                }
            }
            (Some(a), Some(b)) if a.len() == b.len() => AliasResult::NoAlias,
            _ => AliasResult::MayAlias,
        }
    }

    fn accesses(&self, inst: InstId) -> Accesses {
        let program = self.program;
        let access = |ptr, reads, writes| Access { ptr, reads, writes };

        let accesses = match program.kind(inst) {
            InstKind::Load { ptr } => vec![access(*ptr, true, false)],
            InstKind::Store { ptr, .. } => vec![access(*ptr, false, true)],
            InstKind::Intrinsic(Intrinsic::MemCopy { dst, src, .. })
            | InstKind::Intrinsic(Intrinsic::MemMove { dst, src, .. }) => {
                vec![access(*dst, false, true), access(*src, true, false)]
            }
            InstKind::Intrinsic(Intrinsic::MemSet { dst, .. }) => vec![access(*dst, false, true)],
            InstKind::Intrinsic(Intrinsic::LifetimeStart(ptr))
            | InstKind::Intrinsic(Intrinsic::LifetimeEnd(ptr)) => vec![access(*ptr, false, true)],
            InstKind::Intrinsic(Intrinsic::Marker { .. }) => Vec::new(),
            InstKind::Call { args, .. } => {
                let func = program.callee(inst)?;
                if !self.purity.is_local(func) {
                    return None;
                }
                args.iter()
                    .enumerate()
                    .filter(|(_, arg)| !arg.is_const())
                    .map(|(i, arg)| {
                        access(
                            *arg,
                            !self.purity.write_only_formal_arg(func, i),
                            !self.purity.read_only_formal_arg(func, i),
                        )
                    })
                    .collect()
            }
            _ => Vec::new(),
        };
        Some(accesses)
    }
}

fn trimmed(offsets: &[i64]) -> &[i64] {
    let len = offsets.iter().rposition(|&o| o != 0).map_or(0, |p| p + 1);
    &offsets[..len]
}

impl AliasOracle for BasicAliasOracle<'_> {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn alias(&mut self, p1: Value, p2: Value) -> AliasResult {
        if p1 == p2 {
            return AliasResult::MustAlias;
        }
        self.alias_across(p1, p2, TemporalRelation::Same)
    }

    fn modref(
        &mut self,
        i1: InstId,
        rel: TemporalRelation,
        i2: InstId,
        _lp: Option<&Loop>,
    ) -> ModRefResult {
        let program = self.program;
        let reads1 = program.may_read_memory(i1);
        let writes1 = program.may_write_memory(i1);
        let upper = ModRefResult::from_access(reads1, writes1);

        let result = match (self.accesses(i1), self.accesses(i2)) {
            (_, Some(second)) if second.is_empty() => ModRefResult::NoModRef,
            (Some(first), _) if first.is_empty() => ModRefResult::NoModRef,
            (None, _) => upper,
            (Some(first), None) => first.iter().fold(ModRefResult::NoModRef, |acc, a| {
                acc | ModRefResult::from_access(a.reads, a.writes)
            }),
            (Some(first), Some(second)) => {
                let mut result = ModRefResult::NoModRef;
                for a in &first {
                    let overlaps = second.iter().any(|b| {
                        let same_value = a.ptr == b.ptr && rel == TemporalRelation::Same;
                        same_value || self.alias_across(a.ptr, b.ptr, rel) != AliasResult::NoAlias
                    });
                    if overlaps {
                        result = result | ModRefResult::from_access(a.reads, a.writes);
                    }
                }
                result
            }
        };

        trace!(
            first = %program.inst_label(i1),
            second = %program.inst_label(i2),
            %rel,
            %result,
            "basic modref"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killflow_core::{FunctionAttrs, ProgramBuilder};

    #[test]
    fn test_alias_by_objects_and_offsets() {
        let mut builder = ProgramBuilder::new();
        let g = builder.global("g", Some(4), false).unwrap();
        let h = builder.global("h", None, false).unwrap();
        let mut func = builder.define("f", &["p"]).unwrap();
        func.block("entry");
        let p = func.param(0);
        let a = func.alloca(Some(Value::Const(8)));
        let a0 = func.element_ptr(a, vec![Value::Const(0)]);
        let a1 = func.element_ptr(a, vec![Value::Const(1)]);
        let a1_again = func.element_ptr(a, vec![Value::Const(1)]);
        let g2 = func.element_ptr(g, vec![Value::Const(2)]);
        func.ret(None);
        let program = builder.finish().unwrap();
        let mut oracle = BasicAliasOracle::new(&program);

        assert_eq!(oracle.alias(a, a0), AliasResult::MustAlias);
        assert_eq!(oracle.alias(a1, a1_again), AliasResult::MustAlias);
        assert_eq!(oracle.alias(a0, a1), AliasResult::NoAlias);
        assert_eq!(oracle.alias(g2, h), AliasResult::NoAlias);
        assert_eq!(oracle.alias(a, g), AliasResult::NoAlias);
        assert_eq!(oracle.alias(p, a1), AliasResult::NoAlias);
        assert_eq!(oracle.alias(p, g), AliasResult::MayAlias);
    }

    #[test]
    fn test_modref_of_loads_stores_and_calls() {
        let mut builder = ProgramBuilder::new();
        let g = builder.global("g", None, false).unwrap();
        let h = builder.global("h", None, false).unwrap();
        builder
            .declare("peek", &["p"], FunctionAttrs {
                read_only: true,
                local: true,
                ..FunctionAttrs::default()
            })
            .unwrap();
        builder.declare("opaque", &[], FunctionAttrs::default()).unwrap();
        let mut func = builder.define("f", &[]).unwrap();
        func.block("entry");
        let peek = func.callee("peek");
        let opaque = func.callee("opaque");
        let store_g = func.store(Value::Const(1), g);
        let load_g = func.load(g).as_inst().unwrap();
        let load_h = func.load(h).as_inst().unwrap();
        let peek_g = func.call(peek, vec![g]).as_inst().unwrap();
        let unknown = func.call(opaque, vec![]).as_inst().unwrap();
        func.ret(None);
        let program = builder.finish().unwrap();
        let mut oracle = BasicAliasOracle::new(&program);
        let same = TemporalRelation::Same;

        assert_eq!(oracle.modref(store_g, same, load_g, None), ModRefResult::Mod);
        assert_eq!(oracle.modref(load_g, same, store_g, None), ModRefResult::Ref);
        assert_eq!(oracle.modref(store_g, same, load_h, None), ModRefResult::NoModRef);
        assert_eq!(oracle.modref(peek_g, same, store_g, None), ModRefResult::Ref);
        assert_eq!(oracle.modref(peek_g, same, load_h, None), ModRefResult::NoModRef);
        assert_eq!(oracle.modref(unknown, same, load_h, None), ModRefResult::ModRef);
        assert_eq!(oracle.modref(store_g, same, unknown, None), ModRefResult::Mod);
    }

    #[test]
    fn test_per_iteration_addresses_are_not_equated() {
        let mut builder = ProgramBuilder::new();
        let mut func = builder.define("f", &["p"]).unwrap();
        let entry = func.block("entry");
        let body = func.block("body");
        func.switch_to(entry);
        func.jump(body);
        func.switch_to(body);
        let slot = func.alloca(None);
        let store = func.store(Value::Const(0), slot);
        let load = func.load(slot).as_inst().unwrap();
        func.jump(body);
        let program = builder.finish().unwrap();
        let mut oracle = BasicAliasOracle::new(&program);

        assert_eq!(
            oracle.modref(store, TemporalRelation::Same, load, None),
            ModRefResult::Mod
        );
        assert_eq!(
            oracle.alias_across(slot, slot, TemporalRelation::Before),
            AliasResult::MayAlias
        );
    }
}
