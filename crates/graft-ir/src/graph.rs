//! Arena implementation of a method graph.

use std::fmt;

use graft_dex::DataType;
use rustc_hash::FxHashMap;

use crate::block::{BasicBlock, BlockId};
use crate::host::HostGraph;
use crate::instr::{Constant, ConstantKey, Environment, InstrId, InstrKind, Instruction, NewInstr, Use};
use crate::{GraphError, Result};

/// IR graph of one method.
///
/// Instructions live in an arena indexed by [`InstrId`]; blocks hold ordered
/// id lists. Every input and environment entry is mirrored as a use on the
/// defining instruction. Block 0 is the entry block.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    instructions: Vec<Instruction>,
    blocks: Vec<BasicBlock>,
    entry: BlockId,
    parameters: Vec<InstrId>,
    current_method: Option<InstrId>,
    constants: FxHashMap<ConstantKey, InstrId>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create a graph with an empty entry block.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            blocks: vec![BasicBlock::default()],
            entry: BlockId(0),
            parameters: Vec::new(),
            current_method: None,
            constants: FxHashMap::default(),
        }
    }

    /// Add an empty block.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(BasicBlock::default());
        id
    }

    /// Add a CFG edge.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> Result<()> {
        self.check_block(from)?;
        self.check_block(to)?;
        self.blocks[from.index()].successors.push(to);
        self.blocks[to.index()].predecessors.push(from);
        Ok(())
    }

    /// Append an instruction to the end of a block that is not yet terminated.
    pub fn append(&mut self, block: BlockId, instr: NewInstr) -> Result<InstrId> {
        self.check_block(block)?;
        if let Some(last) = self.blocks[block.index()].last() {
            if self.instructions[last.index()].kind.is_terminator() {
                return Err(GraphError::BlockTerminated(block));
            }
        }
        let position = self.blocks[block.index()].len();
        self.place(block, position, instr)
    }

    /// Define the next parameter value in the entry block.
    pub fn add_parameter(&mut self, ty: DataType, is_this: Option<bool>, can_be_null: bool) -> InstrId {
        let index = u16::try_from(self.parameters.len()).unwrap_or(u16::MAX);
        let kind = InstrKind::ParameterValue {
            index,
            is_this,
            can_be_null,
        };
        let id = self.allocate_in_entry(NewInstr::new(kind, ty));
        self.parameters.push(id);
        id
    }

    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id.index())
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    pub fn num_instructions(&self) -> usize {
        self.instructions.len()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// All instructions in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instruction)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, instr)| (InstrId(u32::try_from(i).unwrap_or(u32::MAX)), instr))
    }

    /// Reachable blocks in reverse post-order from the entry block.
    pub fn reverse_post_order(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut post = Vec::with_capacity(self.blocks.len());
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.index()] = true;

        while let Some(top) = stack.len().checked_sub(1) {
            let (block, next) = stack[top];
            if let Some(&succ) = self.blocks[block.index()].successors.get(next) {
                stack[top].1 += 1;
                if !visited[succ.index()] {
                    visited[succ.index()] = true;
                    stack.push((succ, 0));
                }
            } else {
                post.push(block);
                stack.pop();
            }
        }

        post.reverse();
        post
    }

    fn check_block(&self, block: BlockId) -> Result<()> {
        if block.index() < self.blocks.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownBlock(block))
        }
    }

    fn check_instr(&self, instr: InstrId) -> Result<()> {
        if self.contains(instr) {
            Ok(())
        } else {
            Err(GraphError::UnknownInstruction(instr))
        }
    }

    /// Validate operands, then allocate at `position` in `block`.
    fn place(&mut self, block: BlockId, position: usize, instr: NewInstr) -> Result<InstrId> {
        for &input in &instr.inputs {
            self.check_instr(input)?;
        }
        if let Some(env) = &instr.environment {
            for (_, value) in env.values() {
                self.check_instr(value)?;
            }
        }
        Ok(self.allocate(block, position, instr))
    }

    /// Entry-block definitions go right before the entry terminator.
    fn allocate_in_entry(&mut self, instr: NewInstr) -> InstrId {
        let entry = &self.blocks[self.entry.index()];
        let position = match entry.last() {
            Some(last) if self.instructions[last.index()].kind.is_terminator() => entry.len() - 1,
            _ => entry.len(),
        };
        self.allocate(self.entry, position, instr)
    }

    fn allocate(&mut self, block: BlockId, position: usize, instr: NewInstr) -> InstrId {
        let id = InstrId(u32::try_from(self.instructions.len()).unwrap_or(u32::MAX));

        for (index, input) in instr.inputs.iter().enumerate() {
            self.instructions[input.index()]
                .uses
                .push(Use { user: id, index });
        }
        if let Some(env) = &instr.environment {
            for (slot, value) in env.values() {
                self.instructions[value.index()]
                    .env_uses
                    .push(Use { user: id, index: slot });
            }
        }

        self.instructions.push(Instruction {
            kind: instr.kind,
            ty: instr.ty,
            block,
            inputs: instr.inputs,
            environment: instr.environment,
            dex_pc: instr.dex_pc,
            uses: Vec::new(),
            env_uses: Vec::new(),
        });
        self.blocks[block.index()].instructions.insert(position, id);
        id
    }

    fn anchor_position(&self, anchor: InstrId) -> Result<(BlockId, usize)> {
        self.check_instr(anchor)?;
        let block = self.instructions[anchor.index()].block;
        let position = self.blocks[block.index()]
            .position(anchor)
            .ok_or(GraphError::Detached(anchor))?;
        Ok((block, position))
    }
}

impl HostGraph for Graph {
    fn entry_block(&self) -> BlockId {
        self.entry
    }

    fn blocks(&self) -> Vec<BlockId> {
        self.reverse_post_order()
    }

    fn block_instructions(&self, block: BlockId) -> &[InstrId] {
        self.blocks
            .get(block.index())
            .map_or(&[], |b| b.instructions.as_slice())
    }

    fn predecessors(&self, block: BlockId) -> &[BlockId] {
        self.blocks
            .get(block.index())
            .map_or(&[], |b| b.predecessors.as_slice())
    }

    fn successors(&self, block: BlockId) -> &[BlockId] {
        self.blocks
            .get(block.index())
            .map_or(&[], |b| b.successors.as_slice())
    }

    fn contains(&self, instr: InstrId) -> bool {
        instr.index() < self.instructions.len()
    }

    fn block_of(&self, instr: InstrId) -> BlockId {
        self.instructions[instr.index()].block
    }

    fn kind(&self, instr: InstrId) -> &InstrKind {
        &self.instructions[instr.index()].kind
    }

    fn data_type(&self, instr: InstrId) -> DataType {
        self.instructions[instr.index()].ty
    }

    fn inputs(&self, instr: InstrId) -> &[InstrId] {
        &self.instructions[instr.index()].inputs
    }

    fn environment(&self, instr: InstrId) -> Option<&Environment> {
        self.instructions[instr.index()].environment.as_ref()
    }

    fn dex_pc(&self, instr: InstrId) -> u32 {
        self.instructions[instr.index()].dex_pc
    }

    fn parameters(&self) -> &[InstrId] {
        &self.parameters
    }

    fn parameter_is_receiver(&self, param: InstrId) -> Option<bool> {
        match self.instructions.get(param.index())?.kind {
            InstrKind::ParameterValue { is_this, .. } => is_this,
            _ => None,
        }
    }

    fn can_be_null(&self, instr: InstrId) -> bool {
        let instr = &self.instructions[instr.index()];
        match instr.kind {
            InstrKind::ParameterValue { can_be_null, .. } => can_be_null,
            InstrKind::Constant(c) => c == Constant::Null,
            InstrKind::CurrentMethod => false,
            _ => instr.ty == DataType::Reference,
        }
    }

    fn current_method(&mut self) -> InstrId {
        if let Some(id) = self.current_method {
            return id;
        }
        let id = self.allocate_in_entry(NewInstr::new(InstrKind::CurrentMethod, DataType::Reference));
        self.current_method = Some(id);
        id
    }

    fn constant(&mut self, value: Constant) -> InstrId {
        let key = value.key();
        if let Some(&id) = self.constants.get(&key) {
            return id;
        }
        let id = self.allocate_in_entry(NewInstr::new(
            InstrKind::Constant(value),
            value.data_type(),
        ));
        self.constants.insert(key, id);
        id
    }

    fn insert_before(&mut self, anchor: InstrId, instr: NewInstr) -> Result<InstrId> {
        let (block, position) = self.anchor_position(anchor)?;
        if instr.kind.is_terminator() {
            return Err(GraphError::TerminatorInsertion {
                kind: instr.kind.name().to_string(),
                block,
            });
        }
        self.place(block, position, instr)
    }

    fn insert_after(&mut self, anchor: InstrId, instr: NewInstr) -> Result<InstrId> {
        let (block, position) = self.anchor_position(anchor)?;
        if self.instructions[anchor.index()].kind.is_terminator() {
            return Err(GraphError::InsertAfterTerminator(anchor));
        }
        if instr.kind.is_terminator() {
            return Err(GraphError::TerminatorInsertion {
                kind: instr.kind.name().to_string(),
                block,
            });
        }
        self.place(block, position + 1, instr)
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block_id in self.reverse_post_order() {
            let block = &self.blocks[block_id.index()];
            write!(f, "{block_id}")?;
            if block_id == self.entry {
                f.write_str(" (entry)")?;
            }
            if !block.successors.is_empty() {
                let succs: Vec<String> = block.successors.iter().map(ToString::to_string).collect();
                write!(f, " -> {}", succs.join(", "))?;
            }
            writeln!(f)?;

            for &id in &block.instructions {
                let instr = &self.instructions[id.index()];
                write!(f, "  {id}: {} {}", instr.ty.shorty(), instr.kind.name())?;
                match &instr.kind {
                    InstrKind::Constant(c) => write!(f, " {c}")?,
                    InstrKind::Invoke(invoke) => write!(f, " {}", invoke.callee)?,
                    InstrKind::ParameterValue { index, .. } => write!(f, " #{index}")?,
                    _ => {}
                }
                if !instr.inputs.is_empty() {
                    let inputs: Vec<String> = instr.inputs.iter().map(ToString::to_string).collect();
                    write!(f, " ({})", inputs.join(", "))?;
                }
                if let Some(env) = &instr.environment {
                    let vregs: Vec<String> = env
                        .vregs
                        .iter()
                        .map(|v| v.map_or_else(|| "_".to_string(), |v| v.to_string()))
                        .collect();
                    write!(f, " env[{}]", vregs.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
