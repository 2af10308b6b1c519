use crate::block::{BasicBlock, Terminator};
use crate::entities::{BlockId, FuncId, GlobalId, InstId};
use crate::function::Function;
use crate::instructions::{InstData, InstKind, Intrinsic};
use crate::values::Value;
use crate::{IrError, Result};
use cranelift_entity::PrimaryMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    /// Element count for array globals; scalars have none.
    pub len: Option<u64>,
    pub zero_init: bool,
}

/// A whole program. Functions, blocks, instructions and globals live in dense arenas so that an
/// id alone identifies the entity and the function that owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub functions: PrimaryMap<FuncId, Function>,
    pub blocks: PrimaryMap<BlockId, BasicBlock>,
    pub insts: PrimaryMap<InstId, InstData>,
    pub globals: PrimaryMap<GlobalId, Global>,
    function_names: IndexMap<String, FuncId>,
    global_names: IndexMap<String, GlobalId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: Function) -> Result<FuncId> {
        if self.function_names.contains_key(&function.name) {
            return Err(IrError::Duplicate(format!("@{}", function.name)));
        }
        let name = function.name.clone();
        let id = self.functions.push(function);
        self.function_names.insert(name, id);
        Ok(id)
    }

    pub fn add_global(&mut self, global: Global) -> Result<GlobalId> {
        if self.global_names.contains_key(&global.name) {
            return Err(IrError::Duplicate(format!("@{}", global.name)));
        }
        let name = global.name.clone();
        let id = self.globals.push(global);
        self.global_names.insert(name, id);
        Ok(id)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id]
    }

    pub fn kind(&self, id: InstId) -> &InstKind {
        &self.insts[id].kind
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id]
    }

    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.function_names.get(name).copied()
    }

    pub fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        self.global_names.get(name).copied()
    }

    pub fn lookup_function(&self, name: &str) -> Result<FuncId> {
        self.function_by_name(name)
            .ok_or_else(|| IrError::UnknownFunction(name.to_string()))
    }

    pub fn lookup_block(&self, func: FuncId, name: &str) -> Result<BlockId> {
        self.function(func)
            .blocks
            .iter()
            .copied()
            .find(|&b| self.block(b).name == name)
            .ok_or_else(|| IrError::UnknownBlock {
                function: self.function(func).name.clone(),
                block: name.to_string(),
            })
    }

    pub fn lookup_inst(&self, func: FuncId, name: &str) -> Result<InstId> {
        self.insts_of(func)
            .find(|&i| self.inst(i).name.as_deref() == Some(name))
            .ok_or_else(|| IrError::UnknownInstruction {
                function: self.function(func).name.clone(),
                inst: name.to_string(),
            })
    }

    pub fn defined_functions(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.functions
            .iter()
            .filter(|(_, f)| !f.is_declaration())
            .map(|(id, _)| id)
    }

    pub fn insts_of(&self, func: FuncId) -> impl Iterator<Item = InstId> + '_ {
        self.function(func)
            .blocks
            .iter()
            .flat_map(move |&b| self.block(b).insts.iter().copied())
    }

    pub fn function_of(&self, inst: InstId) -> FuncId {
        self.insts[inst].func
    }

    pub fn block_of(&self, inst: InstId) -> BlockId {
        self.insts[inst].block
    }

    pub fn position(&self, inst: InstId) -> usize {
        self.block(self.block_of(inst))
            .position(inst)
            .unwrap_or_default()
    }

    pub fn next_inst(&self, inst: InstId) -> Option<InstId> {
        let block = self.block(self.block_of(inst));
        let pos = block.position(inst)?;
        block.insts.get(pos + 1).copied()
    }

    pub fn prev_inst(&self, inst: InstId) -> Option<InstId> {
        let block = self.block(self.block_of(inst));
        let pos = block.position(inst)?;
        pos.checked_sub(1).map(|p| block.insts[p])
    }

    pub fn first_inst(&self, block: BlockId) -> Option<InstId> {
        self.block(block).first_inst()
    }

    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        self.block(block)
            .last_inst()
            .filter(|&i| self.kind(i).is_terminator())
    }

    pub fn terminator_kind(&self, block: BlockId) -> Option<&Terminator> {
        match self.kind(self.terminator(block)?) {
            InstKind::Terminator(term) => Some(term),
            _ => None,
        }
    }

    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.terminator_kind(block)
            .map(|t| t.successors())
            .unwrap_or_default()
    }

    /// Target of a direct call, if `inst` is one.
    pub fn callee(&self, inst: InstId) -> Option<FuncId> {
        match self.kind(inst) {
            InstKind::Call {
                callee: Value::Func(f),
                ..
            } => Some(*f),
            _ => None,
        }
    }

    pub fn call_args(&self, inst: InstId) -> &[Value] {
        match self.kind(inst) {
            InstKind::Call { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_call(&self, inst: InstId) -> bool {
        self.kind(inst).is_call()
    }

    pub fn is_defined(&self, func: FuncId) -> bool {
        !self.function(func).is_declaration()
    }

    pub fn may_read_memory(&self, inst: InstId) -> bool {
        match self.kind(inst) {
            InstKind::Load { .. } => true,
            InstKind::Call { .. } => true,
            InstKind::Intrinsic(Intrinsic::MemSet { .. }) => false,
            InstKind::Intrinsic(_) => true,
            _ => false,
        }
    }

    pub fn may_write_memory(&self, inst: InstId) -> bool {
        match self.kind(inst) {
            InstKind::Store { .. } => true,
            InstKind::Call { .. } => match self.callee(inst) {
                Some(f) => {
                    let function = self.function(f);
                    !(function.is_declaration() && function.attrs.read_only)
                }
                None => true,
            },
            InstKind::Intrinsic(_) => true,
            _ => false,
        }
    }

    pub fn pointer_operand(&self, inst: InstId) -> Option<Value> {
        self.kind(inst).pointer_operand()
    }

    pub fn is_load(&self, inst: InstId) -> bool {
        matches!(self.kind(inst), InstKind::Load { .. })
    }

    pub fn is_store(&self, inst: InstId) -> bool {
        matches!(self.kind(inst), InstKind::Store { .. })
    }

    /// Index of the next instruction to be created; lets a reader pre-number forward references.
    pub fn next_inst_id(&self) -> InstId {
        self.insts.next_key()
    }

    pub fn value_name(&self, value: Value) -> String {
        match value {
            Value::Inst(id) => match &self.inst(id).name {
                Some(name) => format!("%{}", name),
                None => format!("%{}", id),
            },
            Value::Param(f, idx) => match self.function(f).params.get(idx as usize) {
                Some(p) => format!("%{}", p.name),
                None => format!("%arg{}", idx),
            },
            Value::Global(g) => format!("@{}", self.global(g).name),
            Value::Func(f) => format!("@{}", self.function(f).name),
            Value::Const(c) => c.to_string(),
            Value::Undef => "undef".to_string(),
        }
    }

    pub fn inst_label(&self, inst: InstId) -> String {
        let data = self.inst(inst);
        match &data.name {
            Some(name) => format!("{}:%{}", self.function(data.func).name, name),
            None => format!("{}:{}", self.function(data.func).name, inst),
        }
    }
}
