use crate::entities::{BlockId, FuncId};
use crate::program::Program;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub entry: Option<BlockId>,
    /// Blocks in layout order.
    pub blocks: Vec<BlockId>,
    pub edges: HashMap<BlockId, Vec<BlockId>>,
    pub reverse_edges: HashMap<BlockId, Vec<BlockId>>,
    /// Blocks ending in `ret` or `unreachable`, in layout order.
    pub exits: Vec<BlockId>,
}

impl ControlFlowGraph {
    pub fn build(program: &Program, func: FuncId) -> Self {
        let function = program.function(func);
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        let mut exits = Vec::new();

        for &block in &function.blocks {
            let successors = program.successors(block);
            let is_exit = program
                .terminator_kind(block)
                .map_or(false, |t| t.is_exit());
            if is_exit {
                exits.push(block);
            }

            for &succ in &successors {
                reverse_edges.entry(succ).or_default().push(block);
            }
            edges.insert(block, successors);
        }

        Self {
            entry: function.entry_block(),
            blocks: function.blocks.clone(),
            edges,
            reverse_edges,
            exits,
        }
    }

    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        self.reverse_edges
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        self.edges.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn reachable_blocks(&self) -> HashSet<BlockId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<BlockId> = self.entry.into_iter().collect();

        while let Some(current) = queue.pop_front() {
            if visited.insert(current) {
                queue.extend(self.successors(current).iter().copied());
            }
        }

        visited
    }

    /// Blocks reachable from `from`, including `from` itself.
    pub fn reachable_from(&self, from: BlockId) -> HashSet<BlockId> {
        Self::walk(from, |b| self.successors(b))
    }

    /// Blocks that can reach `to`, including `to` itself.
    pub fn reaching(&self, to: BlockId) -> HashSet<BlockId> {
        Self::walk(to, |b| self.predecessors(b))
    }

    fn walk<'g>(start: BlockId, next: impl Fn(BlockId) -> &'g [BlockId]) -> HashSet<BlockId> {
        let mut visited = HashSet::new();
        let mut worklist = vec![start];
        while let Some(block) = worklist.pop() {
            if visited.insert(block) {
                worklist.extend(next(block).iter().copied());
            }
        }
        visited
    }
}
