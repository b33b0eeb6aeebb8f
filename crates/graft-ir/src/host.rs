//! Capability interface a host compiler graph exposes to the injection core.

use graft_dex::DataType;

use crate::Result;
use crate::block::BlockId;
use crate::instr::{Constant, Environment, InstrId, InstrKind, NewInstr};

/// Narrow view of a method's IR graph.
///
/// The graph stays owned by the host; the core only reads it and splices
/// new instructions in. Each graph is touched by a single compiling thread.
pub trait HostGraph {
    /// Entry block. Holds parameter definitions, constants and the
    /// current-method value, never an invoke, and ends with a `Goto`.
    fn entry_block(&self) -> BlockId;

    /// Reachable blocks in reverse post order, entry block first.
    fn blocks(&self) -> Vec<BlockId>;

    fn predecessors(&self, block: BlockId) -> &[BlockId];

    fn successors(&self, block: BlockId) -> &[BlockId];

    /// Instructions of a block in program order.
    fn block_instructions(&self, block: BlockId) -> &[InstrId];

    fn first_instruction(&self, block: BlockId) -> Option<InstrId> {
        self.block_instructions(block).first().copied()
    }

    fn last_instruction(&self, block: BlockId) -> Option<InstrId> {
        self.block_instructions(block).last().copied()
    }

    /// Check whether `instr` names a live instruction of this graph.
    fn contains(&self, instr: InstrId) -> bool;

    /// Block holding `instr`.
    fn block_of(&self, instr: InstrId) -> BlockId;

    fn kind(&self, instr: InstrId) -> &InstrKind;

    fn data_type(&self, instr: InstrId) -> DataType;

    fn inputs(&self, instr: InstrId) -> &[InstrId];

    fn environment(&self, instr: InstrId) -> Option<&Environment>;

    fn dex_pc(&self, instr: InstrId) -> u32;

    /// Parameter values in declaration order, receiver first for instance methods.
    fn parameters(&self) -> &[InstrId];

    /// Explicit receiver flag of a parameter, if the host records one.
    fn parameter_is_receiver(&self, param: InstrId) -> Option<bool>;

    /// Nullability of a value.
    fn can_be_null(&self, instr: InstrId) -> bool;

    /// The current-method value, created in the entry block on first use.
    fn current_method(&mut self) -> InstrId;

    /// A constant node, created in the entry block on first use.
    fn constant(&mut self, value: Constant) -> InstrId;

    /// Insert `instr` immediately before `anchor`.
    fn insert_before(&mut self, anchor: InstrId, instr: NewInstr) -> Result<InstrId>;

    /// Insert `instr` immediately after `anchor`. `anchor` must not be a terminator.
    fn insert_after(&mut self, anchor: InstrId, instr: NewInstr) -> Result<InstrId>;
}
