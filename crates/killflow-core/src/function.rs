use crate::entities::BlockId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub attrs: FunctionAttrs,
    pub blocks: Vec<BlockId>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
            attrs: FunctionAttrs::default(),
            blocks: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub read_only: bool,
    pub write_only: bool,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Side-effect summary of a declaration. Defined functions are analysed from their bodies and
/// ignore these flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAttrs {
    /// Never writes memory.
    pub read_only: bool,
    /// Only touches memory reachable from its pointer arguments.
    pub local: bool,
    /// Like `local`, plus a hidden effect on the process I/O state.
    pub semi_local: bool,
    /// Returns a fresh allocation that no other pointer refers to.
    pub no_alias_return: bool,
}
