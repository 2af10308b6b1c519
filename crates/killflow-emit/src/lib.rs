/*! Turn programs and analysis verdicts back into text.
 *
 * The IR emitter prints a program in the same format the parser reads, so a dump can be edited
 * and fed back in. The structure emitter shows what the prover leans on: dominators,
 * post-dominators and the loop nest. Reports render a mod/ref verdict, the flows that kept it
 * from being refined, and the prover counters, either as text for a terminal or as JSON.
 */

pub mod config;
pub mod emitter;
pub mod ir_emitter;
pub mod output;
pub mod report;
pub mod structure;

pub use config::{EmitterConfig, IndentStyle, VerbosityLevel};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use ir_emitter::IrEmitter;
pub use output::{render, OutputFormat};
pub use report::{FlowEntry, FlowsReport, PairVerdict, QueryReport, Report};
pub use structure::StructureEmitter;
