/*! Interprocedural kill proofs for loop-carried memory dependences.
 *
 * A loop can only be parallelised once every cross-iteration flow of a value through memory is
 * either speculated away or proven impossible. Many flows are impossible because the memory is
 * unconditionally overwritten ("killed") between the write and the read, often inside a callee.
 * This crate proves such kills without inlining anything:
 *
 * - [`Context`] names the chain of call sites through which an instruction is observed;
 * - [`InstSearch`] lazily enumerates the memory operations performed by a call site, descending
 *   into callees with dominator and post-dominator trees;
 * - [`KillFlow`] decides whether an object is definitely overwritten before, after or between two
 *   program points, with memoized per-function and per-block summaries;
 * - [`CallsiteDepthCombinator`] answers the externally visible mod/ref query by pairing the two
 *   searches and disproving each candidate flow.
 *
 * Imprecision never surfaces as an error: every entry point answers "proven" or "not proven".
 */

pub mod basic;
pub mod budget;
pub mod combinator;
pub mod config;
pub mod context;
pub mod ctx_inst;
pub mod error;
pub mod introspection;
pub mod kill_flow;
pub mod lookup;
pub mod oracle;
pub mod purity;
pub mod search;
pub mod stats;

pub use basic::BasicAliasOracle;
pub use budget::QueryBudget;
pub use combinator::{CallsiteDepthCombinator, Flow};
pub use config::{AnalysisConfig, WatchFilter};
pub use context::{Context, ContextDisplay, KillDirection};
pub use ctx_inst::{CtxInst, Footprint, MemoryObject};
pub use error::{AnalysisError, Result};
pub use introspection::Introspection;
pub use kill_flow::KillFlow;
pub use lookup::{memory_operations, resolve_function, resolve_inst, resolve_loop};
pub use oracle::{AliasOracle, AliasResult, KillProver, ModRefResult, TemporalRelation};
pub use purity::{DeclarationPurity, PurityOracle};
pub use search::{AccessFilter, InstSearch, SearchDirection};
pub use stats::{CombinatorStats, KillFlowStats};
