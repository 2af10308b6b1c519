use crate::entities::{FuncId, InstId};
use crate::instructions::InstKind;
use crate::program::Program;
use crate::values::Value;
use indexmap::IndexSet;

/// Number of elements in an identified object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extent {
    Elements(u64),
    /// Sized by the runtime value of an operand, e.g. `alloca [%n]`.
    Dynamic(Value),
}

/// Strips address arithmetic and casts down to the value the address is derived from.
pub fn underlying_object(program: &Program, mut value: Value) -> Value {
    loop {
        let Value::Inst(inst) = value else {
            return value;
        };
        match program.kind(inst) {
            InstKind::ElementPtr { base, .. } => value = *base,
            InstKind::Cast { value: inner } => value = *inner,
            _ => return value,
        }
    }
}

/// Like [`underlying_object`], but also looks through `phi` and `select`, collecting every
/// candidate object in discovery order.
pub fn underlying_objects(program: &Program, value: Value) -> IndexSet<Value> {
    let mut objects = IndexSet::new();
    let mut seen = IndexSet::new();
    let mut worklist = vec![value];

    while let Some(v) = worklist.pop() {
        let object = underlying_object(program, v);
        if !seen.insert(object) {
            continue;
        }
        match object {
            Value::Inst(inst) => match program.kind(inst) {
                InstKind::Phi { incoming } => {
                    worklist.extend(incoming.iter().rev().map(|(_, v)| *v));
                }
                InstKind::Select {
                    if_true, if_false, ..
                } => {
                    worklist.push(*if_false);
                    worklist.push(*if_true);
                }
                _ => {
                    objects.insert(object);
                }
            },
            _ => {
                objects.insert(object);
            }
        }
    }

    objects
}

pub fn as_alloca(program: &Program, value: Value) -> Option<InstId> {
    let inst = value.as_inst()?;
    matches!(program.kind(inst), InstKind::Alloca { .. }).then_some(inst)
}

/// Whether `value` is a stack slot allocated by `func`.
pub fn is_alloca_in(program: &Program, value: Value, func: FuncId) -> bool {
    as_alloca(program, value).map_or(false, |inst| program.function_of(inst) == func)
}

/// A fresh allocation whose address is distinct from every other identified object.
pub fn is_identified_object(program: &Program, value: Value) -> bool {
    match value {
        Value::Global(_) => true,
        Value::Inst(inst) => match program.kind(inst) {
            InstKind::Alloca { .. } => true,
            InstKind::Call { .. } => program
                .callee(inst)
                .map_or(false, |f| program.function(f).attrs.no_alias_return),
            _ => false,
        },
        _ => false,
    }
}

pub fn object_extent(program: &Program, object: Value) -> Option<Extent> {
    match object {
        Value::Global(g) => Some(Extent::Elements(program.global(g).len.unwrap_or(1))),
        Value::Inst(inst) => match program.kind(inst) {
            InstKind::Alloca { count: None } => Some(Extent::Elements(1)),
            InstKind::Alloca {
                count: Some(Value::Const(n)),
            } => u64::try_from(*n).ok().map(Extent::Elements),
            InstKind::Alloca { count: Some(n) } => Some(Extent::Dynamic(*n)),
            _ => None,
        },
        _ => None,
    }
}
