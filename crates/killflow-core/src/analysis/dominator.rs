use super::cfg::ControlFlowGraph;
use crate::entities::BlockId;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Dominators,
    PostDominators,
}

/// Dominator or post-dominator tree of one function.
///
/// A post-dominator tree of a function with several exits hangs its exits (and every block whose
/// immediate post-dominator would be "the exit") under a virtual root, so `root()` is `None` and
/// the real top-level nodes are listed by `top_level()`. Blocks that are unreachable from the
/// entry (or, for post-dominators, cannot reach an exit) are not in the tree at all.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    kind: TreeKind,
    root: Option<BlockId>,
    top_level: Vec<BlockId>,
    idom: HashMap<BlockId, BlockId>,
    children: HashMap<BlockId, Vec<BlockId>>,
    depth: HashMap<BlockId, usize>,
}

impl DominatorTree {
    pub fn build(cfg: &ControlFlowGraph) -> Self {
        let starts: Vec<BlockId> = cfg.entry.into_iter().collect();
        Self::compute(
            TreeKind::Dominators,
            &starts,
            |b| cfg.successors(b),
            |b| cfg.predecessors(b),
        )
    }

    pub fn build_post(cfg: &ControlFlowGraph) -> Self {
        Self::compute(
            TreeKind::PostDominators,
            &cfg.exits,
            |b| cfg.predecessors(b),
            |b| cfg.successors(b),
        )
    }

    /// Cooper/Harvey/Kennedy over the graph seen from a virtual root whose successors are
    /// `starts`. `forward` walks away from the root, `backward` towards it.
    fn compute<'g>(
        kind: TreeKind,
        starts: &[BlockId],
        forward: impl Fn(BlockId) -> &'g [BlockId],
        backward: impl Fn(BlockId) -> &'g [BlockId],
    ) -> Self {
        let postorder = Self::postorder(starts, &forward);
        let number: HashMap<BlockId, usize> = postorder
            .iter()
            .enumerate()
            .map(|(i, &b)| (b, i))
            .collect();
        let virtual_root = postorder.len();
        let start_set: HashSet<BlockId> = starts.iter().copied().collect();

        let mut doms: Vec<Option<usize>> = vec![None; postorder.len() + 1];
        doms[virtual_root] = Some(virtual_root);

        let mut changed = true;
        while changed {
            changed = false;

            for &block in postorder.iter().rev() {
                let node = number[&block];
                let mut preds: Vec<usize> = backward(block)
                    .iter()
                    .filter_map(|p| number.get(p).copied())
                    .collect();
                if start_set.contains(&block) {
                    preds.push(virtual_root);
                }

                let mut new_idom = None;
                for pred in preds {
                    if doms[pred].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(&doms, pred, current),
                    });
                }

                if new_idom.is_some() && doms[node] != new_idom {
                    doms[node] = new_idom;
                    changed = true;
                }
            }
        }

        let mut idom = HashMap::new();
        let mut children: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        let mut top_level = Vec::new();

        for &block in postorder.iter().rev() {
            match doms[number[&block]] {
                Some(d) if d == virtual_root => top_level.push(block),
                Some(d) => {
                    let parent = postorder[d];
                    idom.insert(block, parent);
                    children.entry(parent).or_default().push(block);
                }
                None => {}
            }
        }

        let mut depth = HashMap::new();
        let mut queue: VecDeque<(BlockId, usize)> = top_level.iter().map(|&b| (b, 0)).collect();
        while let Some((block, d)) = queue.pop_front() {
            depth.insert(block, d);
            if let Some(kids) = children.get(&block) {
                queue.extend(kids.iter().map(|&k| (k, d + 1)));
            }
        }

        let root = match top_level.as_slice() {
            [only] => Some(*only),
            _ => None,
        };

        Self {
            kind,
            root,
            top_level,
            idom,
            children,
            depth,
        }
    }

    fn postorder<'g>(starts: &[BlockId], forward: &impl Fn(BlockId) -> &'g [BlockId]) -> Vec<BlockId> {
        let mut visited = HashSet::new();
        let mut postorder = Vec::new();

        for &start in starts {
            if !visited.insert(start) {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            while let Some(top) = stack.last_mut() {
                let block = top.0;
                let succs = forward(block);
                if top.1 < succs.len() {
                    let succ = succs[top.1];
                    top.1 += 1;
                    if visited.insert(succ) {
                        stack.push((succ, 0));
                    }
                } else {
                    postorder.push(block);
                    stack.pop();
                }
            }
        }

        postorder
    }

    fn intersect(doms: &[Option<usize>], mut a: usize, mut b: usize) -> usize {
        while a != b {
            while a < b {
                a = doms[a].unwrap_or(b);
            }
            while b < a {
                b = doms[b].unwrap_or(a);
            }
        }
        a
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.depth.contains_key(&block)
    }

    /// The single real root, or `None` when the tree hangs from a virtual root.
    pub fn root(&self) -> Option<BlockId> {
        self.root
    }

    pub fn top_level(&self) -> &[BlockId] {
        &self.top_level
    }

    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied()
    }

    pub fn children(&self, block: BlockId) -> &[BlockId] {
        self.children
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        let (Some(&target), Some(&start)) = (self.depth.get(&dominator), self.depth.get(&dominated))
        else {
            return false;
        };

        let mut current = dominated;
        for _ in target..start {
            match self.idom(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        current == dominator
    }

    /// `block` followed by its chain of immediate dominators, innermost first.
    pub fn ancestors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        let first = self.contains(block).then_some(block);
        std::iter::successors(first, move |&b| self.idom(b))
    }
}
