/*! One import for the whole prover.
 *
 * Parse a program from text, build its structural analyses, ask the combinator whether a call site
 * can carry a value through memory to a later iteration, and print what it found.
 */

pub use killflow_analysis as analysis;
pub use killflow_core as core;
pub use killflow_emit as emit;
pub use killflow_parser as parser;

pub use killflow_core::{
    BasicBlock, BlockId, FuncId, Function, InstId, InstKind, Loop, Program, ProgramAnalyses,
    ProgramBuilder, Terminator, Value,
};

pub use killflow_analysis::{
    AliasOracle, AnalysisConfig, CallsiteDepthCombinator, Context, CtxInst, InstSearch, KillFlow,
    KillProver, ModRefResult, QueryBudget, TemporalRelation,
};

pub use killflow_emit::{FlowsReport, IrEmitter, QueryReport, StructureEmitter};

pub use killflow_parser::{parse, parse_program};
