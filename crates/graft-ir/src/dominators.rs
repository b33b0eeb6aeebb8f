//! Dominator tree over any [`HostGraph`].

use rustc_hash::FxHashMap;

use crate::block::BlockId;
use crate::host::HostGraph;
use crate::instr::InstrId;

/// Immediate dominators of the reachable blocks of a graph.
///
/// Iterative algorithm of Cooper, Harvey and Kennedy over the host's
/// reverse post order. Unreachable blocks dominate nothing and are
/// dominated by nothing.
#[derive(Clone, Debug, Default)]
pub struct Dominators {
    /// Position of each reachable block in reverse post order.
    order: FxHashMap<BlockId, usize>,
    idom: FxHashMap<BlockId, BlockId>,
}

impl Dominators {
    pub fn compute<G: HostGraph + ?Sized>(graph: &G) -> Self {
        let rpo = graph.blocks();
        let order: FxHashMap<BlockId, usize> =
            rpo.iter().enumerate().map(|(i, &block)| (block, i)).collect();

        let mut idom = FxHashMap::default();
        let Some(&entry) = rpo.first() else {
            return Self { order, idom };
        };
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;
                for &pred in graph.predecessors(block) {
                    if !idom.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &order, pred, current),
                    });
                }
                let Some(new_idom) = new_idom else {
                    continue;
                };
                if idom.insert(block, new_idom) != Some(new_idom) {
                    changed = true;
                }
            }
        }
        Self { order, idom }
    }

    /// Immediate dominator of `block`. The entry block is its own.
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied()
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.order.contains_key(&block)
    }

    /// Check whether `a` dominates `b`. Every reachable block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        let mut current = b;
        loop {
            if current == a {
                return self.is_reachable(a);
            }
            match self.idom(current) {
                Some(parent) if parent != current => current = parent,
                _ => return false,
            }
        }
    }

    /// Check whether the value `def` is available to an instruction placed at
    /// `pos` in `block`: defined earlier in the same block, or in a block
    /// that dominates it.
    pub fn value_reaches<G: HostGraph + ?Sized>(
        &self,
        graph: &G,
        def: InstrId,
        block: BlockId,
        pos: usize,
    ) -> bool {
        let def_block = graph.block_of(def);
        if def_block != block {
            return self.dominates(def_block, block);
        }
        graph
            .block_instructions(block)
            .iter()
            .position(|&i| i == def)
            .is_some_and(|d| d < pos)
    }
}

fn intersect(
    idom: &FxHashMap<BlockId, BlockId>,
    order: &FxHashMap<BlockId, usize>,
    a: BlockId,
    b: BlockId,
) -> BlockId {
    let pos = |block: BlockId| order.get(&block).copied().unwrap_or(usize::MAX);
    let mut a = a;
    let mut b = b;
    while a != b {
        while pos(a) > pos(b) {
            match idom.get(&a) {
                Some(&parent) if parent != a => a = parent,
                _ => return b,
            }
        }
        while pos(b) > pos(a) {
            match idom.get(&b) {
                Some(&parent) if parent != b => b = parent,
                _ => return a,
            }
        }
    }
    a
}
