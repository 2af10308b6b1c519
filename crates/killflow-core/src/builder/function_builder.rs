use super::ProgramBuilder;
use crate::block::{BasicBlock, Terminator};
use crate::entities::{BlockId, FuncId, InstId};
use crate::instructions::{BinaryOp, ComparePred, InstData, InstKind, Intrinsic, MarkerKind};
use crate::program::Program;
use crate::values::Value;
use crate::IrError;

pub struct FunctionBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    func: FuncId,
    current: Option<BlockId>,
}

impl<'a> FunctionBuilder<'a> {
    pub(super) fn new(builder: &'a mut ProgramBuilder, func: FuncId) -> Self {
        Self {
            builder,
            func,
            current: None,
        }
    }

    pub fn func_id(&self) -> FuncId {
        self.func
    }

    pub fn program(&self) -> &Program {
        self.builder.program()
    }

    pub fn param(&self, index: u32) -> Value {
        Value::Param(self.func, index)
    }

    pub fn callee(&self, name: &str) -> Value {
        self.builder
            .program()
            .function_by_name(name)
            .map(Value::Func)
            .unwrap_or(Value::Undef)
    }

    /// Creates a block; the first block created becomes the entry block.
    pub fn block(&mut self, name: &str) -> BlockId {
        let program = self.builder.program_mut();
        let id = program.blocks.push(BasicBlock::new(name, self.func));
        program.functions[self.func].blocks.push(id);
        if self.current.is_none() {
            self.current = Some(id);
        }
        id
    }

    pub fn switch_to(&mut self, block: BlockId) -> &mut Self {
        self.current = Some(block);
        self
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current
    }

    pub fn append(&mut self, kind: InstKind) -> InstId {
        let Some(block) = self.current else {
            self.builder
                .record_error(IrError::BuilderError("no current block".to_string()));
            return self.builder.program().next_inst_id();
        };

        let program = self.builder.program_mut();
        if let Some(last) = program.block(block).last_inst() {
            if program.kind(last).is_terminator() {
                let message = format!(
                    "instruction appended after terminator of block '{}'",
                    program.block(block).name
                );
                self.builder.record_error(IrError::BuilderError(message));
            }
        }

        let program = self.builder.program_mut();
        let id = program.insts.push(InstData {
            kind,
            func: self.func,
            block,
            name: None,
        });
        program.blocks[block].insts.push(id);
        id
    }

    /// Rewrites an existing instruction; used to close phi cycles once the back-edge value exists.
    pub fn replace_kind(&mut self, inst: InstId, kind: InstKind) -> &mut Self {
        self.builder.program_mut().insts[inst].kind = kind;
        self
    }

    pub fn set_name(&mut self, inst: InstId, name: &str) -> &mut Self {
        self.builder.program_mut().insts[inst].name = Some(name.to_string());
        self
    }

    pub fn named(&mut self, name: &str, kind: InstKind) -> InstId {
        let id = self.append(kind);
        self.set_name(id, name);
        id
    }

    pub fn alloca(&mut self, count: Option<Value>) -> Value {
        self.append(InstKind::Alloca { count }).into()
    }

    pub fn load(&mut self, ptr: Value) -> Value {
        self.append(InstKind::Load { ptr }).into()
    }

    pub fn store(&mut self, value: Value, ptr: Value) -> InstId {
        self.append(InstKind::Store { value, ptr })
    }

    pub fn element_ptr(&mut self, base: Value, indices: Vec<Value>) -> Value {
        self.append(InstKind::ElementPtr { base, indices }).into()
    }

    pub fn cast(&mut self, value: Value) -> Value {
        self.append(InstKind::Cast { value }).into()
    }

    pub fn phi(&mut self, incoming: Vec<(BlockId, Value)>) -> Value {
        self.append(InstKind::Phi { incoming }).into()
    }

    pub fn select(&mut self, cond: Value, if_true: Value, if_false: Value) -> Value {
        self.append(InstKind::Select {
            cond,
            if_true,
            if_false,
        })
        .into()
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        self.append(InstKind::Binary { op, lhs, rhs }).into()
    }

    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn compare(&mut self, pred: ComparePred, lhs: Value, rhs: Value) -> Value {
        self.append(InstKind::Compare { pred, lhs, rhs }).into()
    }

    pub fn call(&mut self, callee: Value, args: Vec<Value>) -> Value {
        self.append(InstKind::Call { callee, args }).into()
    }

    pub fn lifetime_start(&mut self, ptr: Value) -> InstId {
        self.append(InstKind::Intrinsic(Intrinsic::LifetimeStart(ptr)))
    }

    pub fn lifetime_end(&mut self, ptr: Value) -> InstId {
        self.append(InstKind::Intrinsic(Intrinsic::LifetimeEnd(ptr)))
    }

    pub fn memcpy(&mut self, dst: Value, src: Value, len: Value) -> InstId {
        self.append(InstKind::Intrinsic(Intrinsic::MemCopy { dst, src, len }))
    }

    pub fn memset(&mut self, dst: Value, value: Value, len: Value) -> InstId {
        self.append(InstKind::Intrinsic(Intrinsic::MemSet { dst, value, len }))
    }

    pub fn marker(&mut self, kind: MarkerKind, args: Vec<Value>) -> InstId {
        self.append(InstKind::Intrinsic(Intrinsic::Marker { kind, args }))
    }

    pub fn jump(&mut self, target: BlockId) -> InstId {
        self.append(InstKind::Terminator(Terminator::Jump(target)))
    }

    pub fn branch(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) -> InstId {
        self.append(InstKind::Terminator(Terminator::Branch {
            cond,
            then_block,
            else_block,
        }))
    }

    pub fn ret(&mut self, value: Option<Value>) -> InstId {
        self.append(InstKind::Terminator(Terminator::Return(value)))
    }

    pub fn unreachable(&mut self) -> InstId {
        self.append(InstKind::Terminator(Terminator::Unreachable))
    }
}
