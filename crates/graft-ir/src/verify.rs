//! Graph well-formedness checks.
//!
//! Run after graph surgery to catch broken def-use chains, misplaced
//! terminators and values used outside their dominance region.

use crate::block::BlockId;
use crate::dominators::Dominators;
use crate::graph::Graph;
use crate::host::HostGraph;
use crate::instr::{InstrId, Use};
use crate::{GraphError, Result};

/// Verify a graph, returning the first violation found.
pub fn verify(graph: &Graph) -> Result<()> {
    GraphChecker::new(graph).check()
}

/// Consistency checker over a [`Graph`].
pub struct GraphChecker<'g> {
    graph: &'g Graph,
    rpo: Vec<BlockId>,
    dominators: Dominators,
}

impl<'g> GraphChecker<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            rpo: graph.reverse_post_order(),
            dominators: Dominators::compute(graph),
        }
    }

    pub fn check(&self) -> Result<()> {
        for &block in &self.rpo {
            self.check_block(block)?;
        }
        for &block in &self.rpo {
            for &instr in self.graph.block_instructions(block) {
                self.check_uses(instr)?;
            }
        }
        Ok(())
    }

    /// Check whether `a` dominates `b`.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.dominators.dominates(a, b)
    }

    fn check_block(&self, id: BlockId) -> Result<()> {
        let block = self.graph.block(id).ok_or(GraphError::UnknownBlock(id))?;
        let last = block.last().ok_or(GraphError::EmptyBlock(id))?;
        if !self.graph.kind(last).is_terminator() {
            return Err(GraphError::MissingTerminator(id));
        }
        for &instr in &block.instructions[..block.len() - 1] {
            if self.graph.kind(instr).is_terminator() {
                return Err(GraphError::MisplacedTerminator(instr));
            }
        }

        for &succ in &block.successors {
            let mirrored = self
                .graph
                .block(succ)
                .is_some_and(|s| s.predecessors.contains(&id));
            if !mirrored {
                return Err(GraphError::AsymmetricEdge { from: id, to: succ });
            }
        }
        for &pred in &block.predecessors {
            let mirrored = self
                .graph
                .block(pred)
                .is_some_and(|p| p.successors.contains(&id));
            if !mirrored {
                return Err(GraphError::AsymmetricEdge { from: pred, to: id });
            }
        }
        Ok(())
    }

    fn check_uses(&self, user: InstrId) -> Result<()> {
        let instr = self
            .graph
            .instruction(user)
            .ok_or(GraphError::UnknownInstruction(user))?;

        for (index, &def) in instr.inputs.iter().enumerate() {
            let def_instr = self
                .graph
                .instruction(def)
                .ok_or(GraphError::UnknownInstruction(def))?;
            if !def_instr.uses.contains(&Use { user, index }) {
                return Err(GraphError::MissingUse { def, user });
            }
            self.check_dominance(def, user)?;
        }
        if let Some(env) = &instr.environment {
            for (slot, def) in env.values() {
                let def_instr = self
                    .graph
                    .instruction(def)
                    .ok_or(GraphError::UnknownInstruction(def))?;
                if !def_instr.env_uses.contains(&Use { user, index: slot }) {
                    return Err(GraphError::MissingUse { def, user });
                }
                self.check_dominance(def, user)?;
            }
        }

        // Every recorded use must point back at a real operand.
        for u in &instr.uses {
            let matches = self
                .graph
                .instruction(u.user)
                .is_some_and(|i| i.inputs.get(u.index) == Some(&user));
            if !matches {
                return Err(GraphError::StaleUse { def: user, user: u.user });
            }
        }
        for u in &instr.env_uses {
            let matches = self
                .graph
                .instruction(u.user)
                .and_then(|i| i.environment.as_ref())
                .is_some_and(|env| env.vregs.get(u.index) == Some(&Some(user)));
            if !matches {
                return Err(GraphError::StaleUse { def: user, user: u.user });
            }
        }
        Ok(())
    }

    fn check_dominance(&self, def: InstrId, user: InstrId) -> Result<()> {
        let block = self.graph.block_of(user);
        let pos = self
            .graph
            .block_instructions(block)
            .iter()
            .position(|&i| i == user)
            .unwrap_or(0);
        if self.dominators.value_reaches(self.graph, def, block, pos) {
            Ok(())
        } else {
            Err(GraphError::UseBeforeDef { def, user })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryOp, DataType, GraphBuilder, InvokeKind};

    #[test]
    fn test_built_graph_verifies() {
        let mut b = GraphBuilder::new();
        let this = b.this_parameter();
        let x = b.parameter(DataType::Int);
        let then = b.block();
        let otherwise = b.block();
        b.branch(x, then, otherwise).unwrap();
        b.switch_to(then);
        b.invoke(InvokeKind::Virtual, "void A.f()", DataType::Void, vec![this])
            .unwrap();
        b.ret_void().unwrap();
        b.switch_to(otherwise);
        b.ret_void().unwrap();
        let graph = b.build().unwrap();

        verify(&graph).unwrap();
    }

    #[test]
    fn test_missing_terminator_detected() {
        let mut b = GraphBuilder::new();
        b.suspend_check().unwrap();
        let graph = b.build().unwrap();
        assert_eq!(
            verify(&graph),
            Err(GraphError::MissingTerminator(graph.block(graph.entry_block()).unwrap().successors[0]))
        );
    }

    #[test]
    fn test_use_across_sibling_blocks_detected() {
        let mut b = GraphBuilder::new();
        let x = b.parameter(DataType::Int);
        let then = b.block();
        let otherwise = b.block();
        b.branch(x, then, otherwise).unwrap();
        b.switch_to(then);
        let sum = b.binary(BinaryOp::Add, DataType::Int, x, x).unwrap();
        b.ret_void().unwrap();
        b.switch_to(otherwise);
        b.ret(sum).unwrap();
        let graph = b.build().unwrap();

        let err = verify(&graph).unwrap_err();
        assert!(matches!(err, GraphError::UseBeforeDef { def, .. } if def == sum));
    }

    #[test]
    fn test_dominance_in_diamond() {
        let mut b = GraphBuilder::new();
        let x = b.parameter(DataType::Int);
        let body = b.body();
        let then = b.block();
        let otherwise = b.block();
        let join = b.block();
        b.branch(x, then, otherwise).unwrap();
        b.switch_to(then);
        b.goto(join).unwrap();
        b.switch_to(otherwise);
        b.goto(join).unwrap();
        b.switch_to(join);
        b.ret_void().unwrap();
        let graph = b.build().unwrap();

        let checker = GraphChecker::new(&graph);
        assert!(checker.dominates(body, join));
        assert!(checker.dominates(graph.entry_block(), join));
        assert!(!checker.dominates(then, join));
        assert!(!checker.dominates(otherwise, then));
        assert!(checker.check().is_ok());
    }
}
