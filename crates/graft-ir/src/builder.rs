//! Graph builder fluent API.

use graft_dex::{DataType, MethodIdx, TypeIdx};

use crate::Result;
use crate::block::BlockId;
use crate::graph::Graph;
use crate::host::HostGraph;
use crate::instr::{BinaryOp, Constant, Environment, InstrId, InstrKind, Invoke, InvokeKind, NewInstr};

/// Builder for method graphs.
///
/// Parameters are defined in the entry block. The first body block is
/// created up front and the entry block jumps to it when the graph is built.
/// Calls and suspend checks get an environment holding the current locals.
pub struct GraphBuilder {
    graph: Graph,
    body: BlockId,
    current: BlockId,
    locals: Vec<Option<InstrId>>,
    dex_pc: u32,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        let mut graph = Graph::new();
        let body = graph.add_block();
        Self {
            graph,
            body,
            current: body,
            locals: Vec::new(),
            dex_pc: 0,
        }
    }

    /// Define the implicit receiver. Must come before other parameters.
    pub fn this_parameter(&mut self) -> InstrId {
        let id = self.graph.add_parameter(DataType::Reference, Some(true), false);
        self.locals.push(Some(id));
        id
    }

    /// Define the next declared parameter.
    pub fn parameter(&mut self, ty: DataType) -> InstrId {
        let can_be_null = ty == DataType::Reference;
        let id = self.graph.add_parameter(ty, Some(false), can_be_null);
        self.locals.push(Some(id));
        id
    }

    /// Define a parameter exactly as a host without receiver flags would.
    pub fn raw_parameter(&mut self, ty: DataType, can_be_null: bool) -> InstrId {
        let id = self.graph.add_parameter(ty, None, can_be_null);
        self.locals.push(Some(id));
        id
    }

    /// The first body block.
    pub const fn body(&self) -> BlockId {
        self.body
    }

    /// Add a new empty block.
    pub fn block(&mut self) -> BlockId {
        self.graph.add_block()
    }

    /// Continue appending to `block`.
    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn int(&mut self, value: i32) -> InstrId {
        self.graph.constant(Constant::Int(value))
    }

    pub fn constant(&mut self, value: Constant) -> InstrId {
        self.graph.constant(value)
    }

    pub fn binary(&mut self, op: BinaryOp, ty: DataType, lhs: InstrId, rhs: InstrId) -> Result<InstrId> {
        self.emit(NewInstr::new(InstrKind::Binary(op), ty).with_inputs(vec![lhs, rhs]))
    }

    /// Emit a call. The callee name is the pretty form used for call-site matching.
    pub fn invoke(
        &mut self,
        kind: InvokeKind,
        callee: &str,
        ret: DataType,
        args: Vec<InstrId>,
    ) -> Result<InstrId> {
        let invoke = Invoke {
            kind,
            type_idx: TypeIdx(0),
            method_idx: MethodIdx(0),
            callee: callee.to_string(),
        };
        let env = self.environment();
        self.emit(
            NewInstr::new(InstrKind::Invoke(invoke), ret)
                .with_inputs(args)
                .with_environment(Some(env)),
        )
    }

    pub fn suspend_check(&mut self) -> Result<InstrId> {
        let env = self.environment();
        self.emit(NewInstr::new(InstrKind::SuspendCheck, DataType::Void).with_environment(Some(env)))
    }

    /// Branch on `cond` to `then` or `otherwise`.
    pub fn branch(&mut self, cond: InstrId, then: BlockId, otherwise: BlockId) -> Result<InstrId> {
        let id = self.emit(NewInstr::new(InstrKind::If, DataType::Void).with_inputs(vec![cond]))?;
        self.graph.add_edge(self.current, then)?;
        self.graph.add_edge(self.current, otherwise)?;
        Ok(id)
    }

    pub fn goto(&mut self, target: BlockId) -> Result<InstrId> {
        let id = self.emit(NewInstr::new(InstrKind::Goto, DataType::Void))?;
        self.graph.add_edge(self.current, target)?;
        Ok(id)
    }

    pub fn ret(&mut self, value: InstrId) -> Result<InstrId> {
        let ty = self.graph.data_type(value);
        self.emit(NewInstr::new(InstrKind::Return, ty).with_inputs(vec![value]))
    }

    pub fn ret_void(&mut self) -> Result<InstrId> {
        self.emit(NewInstr::new(InstrKind::ReturnVoid, DataType::Void))
    }

    /// Terminate the entry block with a jump to the body and return the graph.
    pub fn build(mut self) -> Result<Graph> {
        let entry = self.graph.entry_block();
        self.graph
            .append(entry, NewInstr::new(InstrKind::Goto, DataType::Void))?;
        self.graph.add_edge(entry, self.body)?;
        Ok(self.graph)
    }

    fn environment(&self) -> Environment {
        Environment::new(self.dex_pc, self.locals.clone())
    }

    fn emit(&mut self, instr: NewInstr) -> Result<InstrId> {
        let id = self
            .graph
            .append(self.current, instr.with_dex_pc(self.dex_pc))?;
        self.dex_pc += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let mut b = GraphBuilder::new();
        let this = b.this_parameter();
        let x = b.parameter(DataType::Int);
        b.invoke(InvokeKind::Virtual, "void Foo.bar(int)", DataType::Void, vec![this, x])
            .unwrap();
        b.ret_void().unwrap();
        let graph = b.build().unwrap();

        let entry = graph.entry_block();
        assert_eq!(graph.parameters(), &[this, x]);
        assert_eq!(graph.block_instructions(entry).len(), 3);
        assert_eq!(graph.blocks().len(), 2);
        assert_eq!(graph.parameter_is_receiver(this), Some(true));
        assert_eq!(graph.parameter_is_receiver(x), Some(false));
    }

    #[test]
    fn test_branches() {
        let mut b = GraphBuilder::new();
        let x = b.parameter(DataType::Int);
        let then = b.block();
        let otherwise = b.block();
        b.branch(x, then, otherwise).unwrap();
        b.switch_to(then);
        b.ret(x).unwrap();
        b.switch_to(otherwise);
        b.ret_void().unwrap();
        let graph = b.build().unwrap();

        assert_eq!(graph.blocks().len(), 4);
        assert_eq!(graph.block(then).unwrap().predecessors, vec![b_body(&graph)]);
    }

    fn b_body(graph: &Graph) -> BlockId {
        graph.block(graph.entry_block()).unwrap().successors[0]
    }
}
