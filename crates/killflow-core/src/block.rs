use crate::entities::{BlockId, FuncId, InstId};
use crate::values::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    pub func: FuncId,
    pub insts: Vec<InstId>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>, func: FuncId) -> Self {
        Self {
            name: name.into(),
            func,
            insts: Vec::new(),
        }
    }

    pub fn first_inst(&self) -> Option<InstId> {
        self.insts.first().copied()
    }

    /// The last instruction, which is the terminator once the block is complete.
    pub fn last_inst(&self) -> Option<InstId> {
        self.insts.last().copied()
    }

    pub fn position(&self, inst: InstId) -> Option<usize> {
        self.insts.iter().position(|&i| i == inst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    Jump(BlockId),
    Branch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return(Option<Value>),
    Unreachable,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => {
                if then_block == else_block {
                    vec![*then_block]
                } else {
                    vec![*then_block, *else_block]
                }
            }
            Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
        }
    }

    pub fn operands(&self) -> Vec<Value> {
        match self {
            Terminator::Branch { cond, .. } => vec![*cond],
            Terminator::Return(Some(v)) => vec![*v],
            _ => Vec::new(),
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Terminator::Return(_) | Terminator::Unreachable)
    }
}
