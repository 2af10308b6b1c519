use crate::entities::{FuncId, GlobalId, InstId};
use serde::{Deserialize, Serialize};

/// An SSA operand. Pointers and memory objects are identified by the value that produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Inst(InstId),
    Param(FuncId, u32),
    Global(GlobalId),
    Func(FuncId),
    Const(i64),
    Undef,
}

impl Value {
    pub fn as_inst(&self) -> Option<InstId> {
        match self {
            Value::Inst(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<i64> {
        match self {
            Value::Const(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<(FuncId, u32)> {
        match self {
            Value::Param(func, index) => Some((*func, *index)),
            _ => None,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Value::Global(_))
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }
}

impl From<InstId> for Value {
    fn from(inst: InstId) -> Self {
        Value::Inst(inst)
    }
}

impl From<GlobalId> for Value {
    fn from(global: GlobalId) -> Self {
        Value::Global(global)
    }
}
