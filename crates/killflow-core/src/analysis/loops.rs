use super::cfg::ControlFlowGraph;
use super::dominator::DominatorTree;
use crate::entities::{BlockId, FuncId, InstId};
use crate::program::Program;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// A natural loop, identified by its header block.
#[derive(Debug, Clone)]
pub struct Loop {
    pub header: BlockId,
    pub func: FuncId,
    pub blocks: HashSet<BlockId>,
    pub latches: Vec<BlockId>,
    pub exits: Vec<BlockId>,
    pub parent: Option<BlockId>,
    pub subloops: Vec<BlockId>,
    pub depth: usize,
}

impl Loop {
    pub fn contains_block(&self, block: BlockId) -> bool {
        self.blocks.contains(&block)
    }

    pub fn contains_inst(&self, program: &Program, inst: InstId) -> bool {
        self.contains_block(program.block_of(inst))
    }

    pub fn is_innermost(&self) -> bool {
        self.subloops.is_empty()
    }

    pub fn single_latch(&self) -> Option<BlockId> {
        match self.latches.as_slice() {
            [latch] => Some(*latch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoopInfo {
    loops: IndexMap<BlockId, Loop>,
    innermost: HashMap<BlockId, BlockId>,
}

impl LoopInfo {
    pub fn build(func: FuncId, cfg: &ControlFlowGraph, dom: &DominatorTree) -> Self {
        let mut latches: IndexMap<BlockId, Vec<BlockId>> = IndexMap::new();

        for &block in &cfg.blocks {
            if !dom.contains(block) {
                continue;
            }
            for &succ in cfg.successors(block) {
                if dom.dominates(succ, block) {
                    latches.entry(succ).or_default().push(block);
                }
            }
        }

        let mut loops: Vec<Loop> = latches
            .into_iter()
            .map(|(header, latches)| {
                let blocks = Self::collect_body(header, &latches, cfg, dom);
                let mut exits = Vec::new();
                for &block in &cfg.blocks {
                    if !blocks.contains(&block) {
                        continue;
                    }
                    for &succ in cfg.successors(block) {
                        if !blocks.contains(&succ) && !exits.contains(&succ) {
                            exits.push(succ);
                        }
                    }
                }
                Loop {
                    header,
                    func,
                    blocks,
                    latches,
                    exits,
                    parent: None,
                    subloops: Vec::new(),
                    depth: 1,
                }
            })
            .collect();

        loops.sort_by_key(|l| l.blocks.len());

        for i in 0..loops.len() {
            let header = loops[i].header;
            let size = loops[i].blocks.len();
            let parent = loops[i + 1..]
                .iter()
                .find(|outer| outer.blocks.len() > size && outer.blocks.contains(&header))
                .map(|outer| outer.header);
            loops[i].parent = parent;
        }

        let mut by_header: IndexMap<BlockId, Loop> =
            loops.into_iter().map(|l| (l.header, l)).collect();

        let parents: Vec<(BlockId, BlockId)> = by_header
            .values()
            .filter_map(|l| l.parent.map(|p| (p, l.header)))
            .collect();
        for (parent, child) in parents {
            if let Some(outer) = by_header.get_mut(&parent) {
                outer.subloops.push(child);
            }
        }

        let headers: Vec<BlockId> = by_header.keys().copied().collect();
        for header in headers {
            let mut depth = 1;
            let mut current = by_header[&header].parent;
            while let Some(p) = current {
                depth += 1;
                current = by_header[&p].parent;
            }
            if let Some(l) = by_header.get_mut(&header) {
                l.depth = depth;
            }
        }

        let mut innermost = HashMap::new();
        for l in by_header.values() {
            for &block in &l.blocks {
                innermost.entry(block).or_insert(l.header);
            }
        }

        Self {
            loops: by_header,
            innermost,
        }
    }

    fn collect_body(
        header: BlockId,
        latches: &[BlockId],
        cfg: &ControlFlowGraph,
        dom: &DominatorTree,
    ) -> HashSet<BlockId> {
        let mut blocks = HashSet::from([header]);
        let mut worklist: Vec<BlockId> = latches.to_vec();

        while let Some(block) = worklist.pop() {
            if !dom.contains(block) || !blocks.insert(block) {
                continue;
            }
            worklist.extend(cfg.predecessors(block).iter().copied());
        }

        blocks
    }

    pub fn get(&self, header: BlockId) -> Option<&Loop> {
        self.loops.get(&header)
    }

    /// The innermost loop containing `block`.
    pub fn loop_for(&self, block: BlockId) -> Option<&Loop> {
        self.innermost.get(&block).and_then(|h| self.loops.get(h))
    }

    pub fn is_header(&self, block: BlockId) -> bool {
        self.loops.contains_key(&block)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loop> {
        self.loops.values()
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}
