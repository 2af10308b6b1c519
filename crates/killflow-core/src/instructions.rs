use crate::block::Terminator;
use crate::entities::{BlockId, FuncId};
use crate::values::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstData {
    pub kind: InstKind,
    pub func: FuncId,
    pub block: BlockId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstKind {
    Alloca {
        count: Option<Value>,
    },
    Load {
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    ElementPtr {
        base: Value,
        indices: Vec<Value>,
    },
    Cast {
        value: Value,
    },
    Phi {
        incoming: Vec<(BlockId, Value)>,
    },
    Select {
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
    Binary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Compare {
        pred: ComparePred,
        lhs: Value,
        rhs: Value,
    },
    Call {
        callee: Value,
        args: Vec<Value>,
    },
    Intrinsic(Intrinsic),
    Terminator(Terminator),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intrinsic {
    LifetimeStart(Value),
    LifetimeEnd(Value),
    MemCopy { dst: Value, src: Value, len: Value },
    MemMove { dst: Value, src: Value, len: Value },
    MemSet { dst: Value, value: Value, len: Value },
    Marker { kind: MarkerKind, args: Vec<Value> },
}

/// Intrinsics that carry no observable memory effect for dependence purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    InvariantStart,
    InvariantEnd,
    Annotation,
    ObjectSize,
    VaStart,
    VaEnd,
    Debug,
}

impl MarkerKind {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            MarkerKind::InvariantStart => "invariant.start",
            MarkerKind::InvariantEnd => "invariant.end",
            MarkerKind::Annotation => "annotation",
            MarkerKind::ObjectSize => "objectsize",
            MarkerKind::VaStart => "va_start",
            MarkerKind::VaEnd => "va_end",
            MarkerKind::Debug => "dbg",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "invariant.start" => MarkerKind::InvariantStart,
            "invariant.end" => MarkerKind::InvariantEnd,
            "annotation" => MarkerKind::Annotation,
            "objectsize" => MarkerKind::ObjectSize,
            "va_start" => MarkerKind::VaStart,
            "va_end" => MarkerKind::VaEnd,
            "dbg" => MarkerKind::Debug,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "shr",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "rem" => BinaryOp::Rem,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "xor" => BinaryOp::Xor,
            "shl" => BinaryOp::Shl,
            "shr" => BinaryOp::Shr,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparePred {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl ComparePred {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ComparePred::Eq => "eq",
            ComparePred::Ne => "ne",
            ComparePred::Slt => "slt",
            ComparePred::Sle => "sle",
            ComparePred::Sgt => "sgt",
            ComparePred::Sge => "sge",
            ComparePred::Ult => "ult",
            ComparePred::Ule => "ule",
            ComparePred::Ugt => "ugt",
            ComparePred::Uge => "uge",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => ComparePred::Eq,
            "ne" => ComparePred::Ne,
            "slt" => ComparePred::Slt,
            "sle" => ComparePred::Sle,
            "sgt" => ComparePred::Sgt,
            "sge" => ComparePred::Sge,
            "ult" => ComparePred::Ult,
            "ule" => ComparePred::Ule,
            "ugt" => ComparePred::Ugt,
            "uge" => ComparePred::Uge,
            _ => return None,
        })
    }

    pub fn inverse(&self) -> Self {
        match self {
            ComparePred::Eq => ComparePred::Ne,
            ComparePred::Ne => ComparePred::Eq,
            ComparePred::Slt => ComparePred::Sge,
            ComparePred::Sle => ComparePred::Sgt,
            ComparePred::Sgt => ComparePred::Sle,
            ComparePred::Sge => ComparePred::Slt,
            ComparePred::Ult => ComparePred::Uge,
            ComparePred::Ule => ComparePred::Ugt,
            ComparePred::Ugt => ComparePred::Ule,
            ComparePred::Uge => ComparePred::Ult,
        }
    }
}

impl InstKind {
    pub fn operands(&self) -> Vec<Value> {
        match self {
            InstKind::Alloca { count } => count.iter().copied().collect(),
            InstKind::Load { ptr } => vec![*ptr],
            InstKind::Store { value, ptr } => vec![*value, *ptr],
            InstKind::ElementPtr { base, indices } => {
                let mut ops = vec![*base];
                ops.extend(indices.iter().copied());
                ops
            }
            InstKind::Cast { value } => vec![*value],
            InstKind::Phi { incoming } => incoming.iter().map(|(_, v)| *v).collect(),
            InstKind::Select {
                cond,
                if_true,
                if_false,
            } => vec![*cond, *if_true, *if_false],
            InstKind::Binary { lhs, rhs, .. } | InstKind::Compare { lhs, rhs, .. } => {
                vec![*lhs, *rhs]
            }
            InstKind::Call { callee, args } => {
                let mut ops = vec![*callee];
                ops.extend(args.iter().copied());
                ops
            }
            InstKind::Intrinsic(intrinsic) => intrinsic.operands(),
            InstKind::Terminator(term) => term.operands(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, InstKind::Terminator(_))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, InstKind::Call { .. })
    }

    /// Whether the instruction defines an SSA value that other instructions may use.
    pub fn has_result(&self) -> bool {
        match self {
            InstKind::Store { .. } | InstKind::Terminator(_) => false,
            InstKind::Intrinsic(Intrinsic::Marker { kind, .. }) => *kind == MarkerKind::ObjectSize,
            InstKind::Intrinsic(_) => false,
            _ => true,
        }
    }

    pub fn pointer_operand(&self) -> Option<Value> {
        match self {
            InstKind::Load { ptr } | InstKind::Store { ptr, .. } => Some(*ptr),
            _ => None,
        }
    }
}

impl Intrinsic {
    pub fn operands(&self) -> Vec<Value> {
        match self {
            Intrinsic::LifetimeStart(ptr) | Intrinsic::LifetimeEnd(ptr) => vec![*ptr],
            Intrinsic::MemCopy { dst, src, len } | Intrinsic::MemMove { dst, src, len } => {
                vec![*dst, *src, *len]
            }
            Intrinsic::MemSet { dst, value, len } => vec![*dst, *value, *len],
            Intrinsic::Marker { args, .. } => args.clone(),
        }
    }

    pub fn is_lifetime_marker(&self) -> bool {
        matches!(self, Intrinsic::LifetimeStart(_) | Intrinsic::LifetimeEnd(_))
    }

    pub fn is_mem_intrinsic(&self) -> bool {
        matches!(
            self,
            Intrinsic::MemCopy { .. } | Intrinsic::MemMove { .. } | Intrinsic::MemSet { .. }
        )
    }

    pub fn mem_dest(&self) -> Option<Value> {
        match self {
            Intrinsic::MemCopy { dst, .. }
            | Intrinsic::MemMove { dst, .. }
            | Intrinsic::MemSet { dst, .. } => Some(*dst),
            _ => None,
        }
    }

    pub fn mem_source(&self) -> Option<Value> {
        match self {
            Intrinsic::MemCopy { src, .. } | Intrinsic::MemMove { src, .. } => Some(*src),
            _ => None,
        }
    }

    pub fn mem_len(&self) -> Option<Value> {
        match self {
            Intrinsic::MemCopy { len, .. }
            | Intrinsic::MemMove { len, .. }
            | Intrinsic::MemSet { len, .. } => Some(*len),
            _ => None,
        }
    }
}
