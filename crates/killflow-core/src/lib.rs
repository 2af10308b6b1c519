/*! Core IR and structural analyses for loop dependence proofs.
 *
 * Proving that a loop-carried memory dependence cannot happen needs a program representation where
 * every load, store and call site is addressable, plus the control-flow facts (dominance, loop
 * nests, induction variables) that tell which operations always execute before others. This crate
 * provides both: a small SSA IR with a builder, and the per-function analyses computed over it.
 */

pub mod analysis;
pub mod block;
pub mod builder;
pub mod entities;
pub mod function;
pub mod instructions;
pub mod program;
pub mod values;

pub use analysis::{DominanceProvider, DominatorTree, Loop, LoopInfo, ProgramAnalyses};
pub use block::{BasicBlock, Terminator};
pub use builder::{FunctionBuilder, ProgramBuilder};
pub use entities::{BlockId, FuncId, GlobalId, InstId};
pub use function::{Function, FunctionAttrs, Param};
pub use instructions::{BinaryOp, ComparePred, InstData, InstKind, Intrinsic, MarkerKind};
pub use program::{Global, Program};
pub use values::Value;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Unknown block '{block}' in function '{function}'")]
    UnknownBlock { function: String, block: String },
    #[error("Unknown instruction '{inst}' in function '{function}'")]
    UnknownInstruction { function: String, inst: String },
    #[error("Unknown global: {0}")]
    UnknownGlobal(String),
    #[error("Duplicate definition: {0}")]
    Duplicate(String),
    #[error("Builder error: {0}")]
    BuilderError(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
