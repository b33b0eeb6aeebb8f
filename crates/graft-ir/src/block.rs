//! Basic blocks.

use std::fmt;

use crate::instr::InstrId;

/// Identifier of a basic block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Basic block: ordered instructions plus CFG edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BasicBlock {
    /// Instructions in program order. The last one is the terminator.
    pub instructions: Vec<InstrId>,
    /// Predecessor blocks.
    pub predecessors: Vec<BlockId>,
    /// Successor blocks.
    pub successors: Vec<BlockId>,
}

impl BasicBlock {
    pub fn first(&self) -> Option<InstrId> {
        self.instructions.first().copied()
    }

    pub fn last(&self) -> Option<InstrId> {
        self.instructions.last().copied()
    }

    /// Position of an instruction within this block.
    pub fn position(&self, instr: InstrId) -> Option<usize> {
        self.instructions.iter().position(|&i| i == instr)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
