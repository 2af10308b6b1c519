/*! Structural analyses over a program.
 *
 * Dependence proofs lean on "always executes before/after" facts and on knowing how loop indices
 * evolve. These analyses compute the CFG, dominator and post-dominator trees, the natural-loop
 * nest, affine induction variables with trip counts, and underlying objects of pointers, and
 * bundle them behind the `DominanceProvider` interface consumed by the prover.
 */

pub mod cfg;
pub mod dominator;
pub mod evolution;
pub mod loops;
pub mod objects;

pub use cfg::ControlFlowGraph;
pub use dominator::{DominatorTree, TreeKind};
pub use evolution::{AddRec, Evolution, ScalarEvolution, TripCount};
pub use loops::{Loop, LoopInfo};
pub use objects::{underlying_object, underlying_objects, Extent};

use crate::entities::{BlockId, FuncId};
use crate::program::Program;
use std::collections::HashMap;
use tracing::debug;

/// Per-function control-flow facts. Declarations have none.
pub trait DominanceProvider {
    fn cfg(&self, func: FuncId) -> Option<&ControlFlowGraph>;
    fn dominator_tree(&self, func: FuncId) -> Option<&DominatorTree>;
    fn post_dominator_tree(&self, func: FuncId) -> Option<&DominatorTree>;
    fn loop_info(&self, func: FuncId) -> Option<&LoopInfo>;
    fn evolution(&self, func: FuncId) -> Option<&ScalarEvolution>;
}

#[derive(Debug, Clone)]
pub struct FunctionAnalyses {
    pub cfg: ControlFlowGraph,
    pub dominators: DominatorTree,
    pub post_dominators: DominatorTree,
    pub loops: LoopInfo,
    pub evolution: ScalarEvolution,
}

impl FunctionAnalyses {
    pub fn build(program: &Program, func: FuncId) -> Self {
        let cfg = ControlFlowGraph::build(program, func);
        let dominators = DominatorTree::build(&cfg);
        let post_dominators = DominatorTree::build_post(&cfg);
        let loops = LoopInfo::build(func, &cfg, &dominators);
        let evolution = ScalarEvolution::build(program, &loops);

        debug!(
            function = %program.function(func).name,
            blocks = cfg.blocks.len(),
            loops = loops.len(),
            "computed structural analyses"
        );

        Self {
            cfg,
            dominators,
            post_dominators,
            loops,
            evolution,
        }
    }
}

/// Structural analyses for every defined function of a program, computed eagerly.
#[derive(Debug, Clone, Default)]
pub struct ProgramAnalyses {
    functions: HashMap<FuncId, FunctionAnalyses>,
}

impl ProgramAnalyses {
    pub fn build(program: &Program) -> Self {
        let functions = program
            .defined_functions()
            .map(|f| (f, FunctionAnalyses::build(program, f)))
            .collect();
        Self { functions }
    }

    pub fn function(&self, func: FuncId) -> Option<&FunctionAnalyses> {
        self.functions.get(&func)
    }

    pub fn find_loop(&self, func: FuncId, header: BlockId) -> Option<&Loop> {
        self.function(func)?.loops.get(header)
    }
}

impl DominanceProvider for ProgramAnalyses {
    fn cfg(&self, func: FuncId) -> Option<&ControlFlowGraph> {
        self.function(func).map(|a| &a.cfg)
    }

    fn dominator_tree(&self, func: FuncId) -> Option<&DominatorTree> {
        self.function(func).map(|a| &a.dominators)
    }

    fn post_dominator_tree(&self, func: FuncId) -> Option<&DominatorTree> {
        self.function(func).map(|a| &a.post_dominators)
    }

    fn loop_info(&self, func: FuncId) -> Option<&LoopInfo> {
        self.function(func).map(|a| &a.loops)
    }

    fn evolution(&self, func: FuncId) -> Option<&ScalarEvolution> {
        self.function(func).map(|a| &a.evolution)
    }
}
