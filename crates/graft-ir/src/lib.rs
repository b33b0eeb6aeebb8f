//! Method IR graph for the instrumentation core.
//!
//! The injection core only talks to the [`HostGraph`] trait. [`Graph`] is a
//! self-contained arena implementation of it: basic blocks of ordered
//! instructions with def-use and environment-use bookkeeping, shaped after the
//! optimizing compiler graphs the core is meant to plug into.

mod block;
mod builder;
mod dominators;
mod graph;
mod host;
mod instr;
mod keys;
mod verify;

pub use block::*;
pub use builder::*;
pub use dominators::*;
pub use graph::*;
pub use host::*;
pub use instr::*;
pub use keys::*;
pub use verify::*;

pub use graft_dex::DataType;

use thiserror::Error;

/// Graph construction and mutation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown instruction {0}")]
    UnknownInstruction(InstrId),
    #[error("Unknown block {0}")]
    UnknownBlock(BlockId),
    #[error("Instruction {0} is not in a block")]
    Detached(InstrId),
    #[error("Cannot insert after terminator {0}")]
    InsertAfterTerminator(InstrId),
    #[error("Cannot insert terminator {kind} in the middle of block {block}")]
    TerminatorInsertion { kind: String, block: BlockId },
    #[error("Block {0} is already terminated")]
    BlockTerminated(BlockId),
    #[error("Block {0} is empty")]
    EmptyBlock(BlockId),
    #[error("Block {0} does not end with a terminator")]
    MissingTerminator(BlockId),
    #[error("Terminator {0} is not the last instruction of its block")]
    MisplacedTerminator(InstrId),
    #[error("Edge {from} -> {to} is not mirrored")]
    AsymmetricEdge { from: BlockId, to: BlockId },
    #[error("Use of {def} by {user} is not recorded")]
    MissingUse { def: InstrId, user: InstrId },
    #[error("Recorded use of {def} by {user} has no matching input")]
    StaleUse { def: InstrId, user: InstrId },
    #[error("{def} does not dominate its use by {user}")]
    UseBeforeDef { def: InstrId, user: InstrId },
}

pub type Result<T> = std::result::Result<T, GraphError>;
