use graft_dex::{DataType, MethodSignature};
use graft_ir::{Dominators, Environment, GraphError, HostGraph, InstrId, InstrKind, Invoke, NewInstr};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, trace_span};

use super::{Injection, Parameter, Placement, Target, TargetKind};
use crate::codelib::Codelib;
use crate::symbols::CodelibSymbols;
use crate::{Error, HostAdapter, MethodInfo, Result};

/// Bookkeeping shared by every visitor run within one pass.
#[derive(Debug, Default)]
pub struct InjectionState {
    /// The codelib instance call in the entry block, once created.
    codelib_instance: Option<InstrId>,
    /// Nodes created by injection. Never used as anchors.
    injected: FxHashSet<InstrId>,
    /// Shared method-start calls by callee, with the arguments they were made with.
    shared_entry: FxHashMap<MethodSignature, (InstrId, Vec<Parameter>)>,
    calls: usize,
}

impl InjectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn codelib_instance(&self) -> Option<InstrId> {
        self.codelib_instance
    }

    pub fn is_injected(&self, instr: InstrId) -> bool {
        self.injected.contains(&instr)
    }

    /// Codelib calls inserted so far, the instance call excluded.
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

/// A matched insertion point.
struct Site<'i> {
    injection: &'i Injection,
    target: &'i Target,
    anchor: InstrId,
}

/// Applies [`Injection`]s to one method graph.
///
/// Runs in two phases. Planning validates every request and collects all
/// anchors without touching the graph; any problem aborts here, leaving the
/// graph as it was. Splicing then builds argument nodes and call nodes and
/// inserts them next to their anchors.
pub struct InjectionVisitor<'a, G: HostGraph + ?Sized> {
    graph: &'a mut G,
    method: &'a MethodInfo,
    codelib: &'a dyn Codelib,
    symbols: &'a CodelibSymbols,
    adapter: HostAdapter,
    state: &'a mut InjectionState,
}

impl<'a, G: HostGraph + ?Sized> InjectionVisitor<'a, G> {
    pub fn new(
        graph: &'a mut G,
        method: &'a MethodInfo,
        codelib: &'a dyn Codelib,
        symbols: &'a CodelibSymbols,
        adapter: HostAdapter,
        state: &'a mut InjectionState,
    ) -> Self {
        Self {
            graph,
            method,
            codelib,
            symbols,
            adapter,
            state,
        }
    }

    /// Apply `injections`, returning the number of call nodes inserted.
    pub fn run(mut self, injections: &[Injection]) -> Result<usize> {
        let _span = trace_span!("inject", method = %self.method.signature()).entered();

        for injection in injections {
            self.validate(injection)?;
        }
        let sites = self.collect_sites(injections)?;

        // Last call placed after each anchor, so `After` sites keep request order.
        let mut after: FxHashMap<InstrId, InstrId> = FxHashMap::default();
        for site in &sites {
            self.splice(site, &mut after)?;
        }
        self.state.calls += sites.len();
        debug!(
            requests = injections.len(),
            inserted = sites.len(),
            "injection visitor done"
        );
        Ok(sites.len())
    }

    /// Anchor-independent checks of a request.
    fn validate(&self, injection: &Injection) -> Result<()> {
        let signature = injection.signature();
        self.symbols.method_idx(signature)?;

        if injection.targets().is_empty() {
            return Err(Error::malformed(signature, "no targets"));
        }
        for target in injection.targets() {
            if let TargetKind::Custom { pattern, .. } = target.kind() {
                if pattern.is_empty() {
                    return Err(Error::malformed(signature, "custom target without a pattern"));
                }
            }
        }

        if !signature.is_static() {
            match self.codelib.instance_getter() {
                Some(getter) if getter.is_static() => {}
                Some(getter) => {
                    return Err(Error::malformed(
                        getter,
                        "codelib instance getter must be static",
                    ));
                }
                None => {
                    return Err(Error::malformed(
                        signature,
                        "instance call into a codelib without an instance getter",
                    ));
                }
            }
        }

        let expected = signature.proto().params();
        if injection.parameters().len() != expected.len() {
            return Err(Error::malformed(
                signature,
                format!(
                    "expected {} arguments, got {}",
                    expected.len(),
                    injection.parameters().len()
                ),
            ));
        }

        for (i, (&param, ty)) in injection.parameters().iter().zip(expected).enumerate() {
            let actual = match param {
                Parameter::Argument(n) => {
                    let value = self.method.declared_params().get(n).ok_or_else(|| {
                        Error::malformed(signature, format!("method has no argument #{n}"))
                    })?;
                    Some(self.graph.data_type(*value))
                }
                Parameter::This if self.method.receiver().is_none() => {
                    return Err(Error::malformed(signature, "no receiver in a static method"));
                }
                Parameter::Value(value) => {
                    if !self.graph.contains(value) {
                        return Err(Error::malformed(signature, format!("unknown value {value}")));
                    }
                    Some(self.graph.data_type(value))
                }
                // Depends on the anchor.
                Parameter::ReturnValue => None,
                other => other.static_type(),
            };
            if let Some(actual) = actual {
                check_assignable(signature, i, actual, ty.data_type())?;
            }
        }
        Ok(())
    }

    /// Scan the graph and collect every anchor, in block order then program
    /// order, then request order.
    fn collect_sites<'i>(&self, injections: &'i [Injection]) -> Result<Vec<Site<'i>>> {
        let name = self.method.method_name(true);
        let entry = self.graph.entry_block();
        let entry_end = self
            .graph
            .last_instruction(entry)
            .filter(|&i| self.graph.kind(i).is_terminator());

        let wants_start = injections.iter().any(|injection| {
            injection
                .targets()
                .iter()
                .any(|t| matches!(t.kind(), TargetKind::MethodStart) && t.applies_to(&name))
        });
        if wants_start && entry_end.is_none() {
            return Err(GraphError::MissingTerminator(entry).into());
        }

        let dominators = Dominators::compute(&*self.graph);
        let mut planned_shared = FxHashMap::default();
        let mut sites = Vec::new();
        for block in self.graph.blocks() {
            for &instr in self.graph.block_instructions(block) {
                if self.state.injected.contains(&instr) {
                    continue;
                }
                let kind = self.graph.kind(instr);
                for injection in injections {
                    for target in injection.targets() {
                        if !target.applies_to(&name) {
                            continue;
                        }
                        let hit = match target.kind() {
                            TargetKind::MethodStart => Some(instr) == entry_end,
                            _ => target.matches(kind),
                        };
                        if !hit {
                            continue;
                        }
                        if target.is_shared() && self.already_shared(injection, &mut planned_shared)? {
                            trace!(callee = %injection.signature(), "reusing shared entry call");
                            continue;
                        }
                        self.check_anchor(injection, target, instr, &dominators)?;
                        trace!(anchor = %instr, node = kind.name(), target = %target, "matched");
                        sites.push(Site {
                            injection,
                            target,
                            anchor: instr,
                        });
                    }
                }
            }
        }
        Ok(sites)
    }

    fn already_shared<'i>(
        &self,
        injection: &'i Injection,
        planned: &mut FxHashMap<&'i MethodSignature, &'i [Parameter]>,
    ) -> Result<bool> {
        let signature = injection.signature();
        let previous = self
            .state
            .shared_entry
            .get(signature)
            .map(|(_, params)| params.as_slice())
            .or_else(|| planned.get(signature).copied());
        match previous {
            Some(params) if params == injection.parameters() => Ok(true),
            Some(_) => Err(Error::malformed(
                signature,
                "shared method-start call requested with different arguments",
            )),
            None => {
                planned.insert(signature, injection.parameters());
                Ok(false)
            }
        }
    }

    /// Anchor-dependent checks of a request.
    fn check_anchor(
        &self,
        injection: &Injection,
        target: &Target,
        anchor: InstrId,
        dominators: &Dominators,
    ) -> Result<()> {
        let signature = injection.signature();
        let kind = self.graph.kind(anchor);
        if target.placement() == Placement::After && kind.is_terminator() {
            return Err(Error::malformed(
                signature,
                format!("cannot insert after terminator {}", kind.name()),
            ));
        }

        let expected = signature.proto().params();
        for (i, (&param, ty)) in injection.parameters().iter().zip(expected).enumerate() {
            match param {
                Parameter::ReturnValue => {
                    let value = self.return_value(anchor).ok_or_else(|| {
                        Error::malformed(signature, format!("no return value at {}", kind.name()))
                    })?;
                    check_assignable(signature, i, self.graph.data_type(value), ty.data_type())?;
                }
                Parameter::Value(value)
                    if !self.available_at(dominators, value, anchor, target.placement()) =>
                {
                    return Err(Error::malformed(
                        signature,
                        format!("{value} is not available at {anchor}"),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check whether `value` is defined on every path to the insertion point:
    /// earlier in the anchor's block, or in a block dominating it.
    fn available_at(
        &self,
        dominators: &Dominators,
        value: InstrId,
        anchor: InstrId,
        placement: Placement,
    ) -> bool {
        let block = self.graph.block_of(anchor);
        let Some(at) = self
            .graph
            .block_instructions(block)
            .iter()
            .position(|&i| i == anchor)
        else {
            return false;
        };
        let pos = match placement {
            Placement::Before => at,
            Placement::After => at + 1,
        };
        dominators.value_reaches(&*self.graph, value, block, pos)
    }

    fn return_value(&self, anchor: InstrId) -> Option<InstrId> {
        match self.graph.kind(anchor) {
            InstrKind::Return => self.graph.inputs(anchor).first().copied(),
            _ => None,
        }
    }

    fn splice(&mut self, site: &Site<'_>, after: &mut FxHashMap<InstrId, InstrId>) -> Result<InstrId> {
        let signature = site.injection.signature();

        let mut inputs = Vec::with_capacity(site.injection.parameters().len() + 2);
        if !signature.is_static() {
            inputs.push(self.codelib_instance()?);
        }
        for &param in site.injection.parameters() {
            inputs.push(self.materialize(signature, param, site.anchor)?);
        }
        if signature.is_static() && self.adapter.static_invoke_needs_current_method() {
            inputs.push(self.graph.current_method());
        }

        let invoke = Invoke {
            kind: self.adapter.invoke_kind(signature.kind()),
            type_idx: self.symbols.type_idx(),
            method_idx: self.symbols.method_idx(signature)?,
            callee: signature.pretty(true),
        };
        let instr = NewInstr::new(
            InstrKind::Invoke(invoke),
            signature.proto().return_type().data_type(),
        )
        .with_inputs(inputs)
        .with_environment(Some(self.environment_at(site.anchor)))
        .with_dex_pc(self.graph.dex_pc(site.anchor));

        let id = match site.target.placement() {
            Placement::Before => self.graph.insert_before(site.anchor, instr)?,
            Placement::After => {
                let at = after.get(&site.anchor).copied().unwrap_or(site.anchor);
                let id = self.graph.insert_after(at, instr)?;
                after.insert(site.anchor, id);
                id
            }
        };
        self.state.injected.insert(id);
        if site.target.is_shared() {
            self.state
                .shared_entry
                .insert(signature.clone(), (id, site.injection.parameters().to_vec()));
        }
        trace!(call = %id, anchor = %site.anchor, callee = %signature, "spliced call");
        Ok(id)
    }

    fn materialize(&mut self, signature: &MethodSignature, param: Parameter, anchor: InstrId) -> Result<InstrId> {
        let missing = |what: &str| Error::malformed(signature, format!("{what} unavailable"));
        match param {
            Parameter::Value(value) => Ok(value),
            Parameter::Argument(n) => self
                .method
                .declared_params()
                .get(n)
                .copied()
                .ok_or_else(|| missing("argument")),
            Parameter::This => self.method.receiver().ok_or_else(|| missing("receiver")),
            Parameter::ReturnValue => self.return_value(anchor).ok_or_else(|| missing("return value")),
            constant => constant
                .constant()
                .map(|c| self.graph.constant(c))
                .ok_or_else(|| missing("constant")),
        }
    }

    /// The codelib instance, fetched once per method at the end of the entry block.
    ///
    /// Created lazily, after other calls may already have been spliced. This
    /// relies on [`HostGraph::entry_block`] holding no invokes: any user of the
    /// instance sits in a block the entry dominates, so the definition still
    /// precedes it.
    fn codelib_instance(&mut self) -> Result<InstrId> {
        if let Some(id) = self.state.codelib_instance {
            return Ok(id);
        }
        let getter = self.codelib.instance_getter().ok_or_else(|| {
            Error::malformed(self.codelib.class_descriptor(), "codelib has no instance getter")
        })?;

        let entry = self.graph.entry_block();
        let anchor = self
            .graph
            .last_instruction(entry)
            .filter(|&i| self.graph.kind(i).is_terminator())
            .ok_or(GraphError::MissingTerminator(entry))?;

        let mut inputs = Vec::new();
        if self.adapter.static_invoke_needs_current_method() {
            inputs.push(self.graph.current_method());
        }
        let invoke = Invoke {
            kind: self.adapter.invoke_kind(getter.kind()),
            type_idx: self.symbols.type_idx(),
            method_idx: self.symbols.method_idx(getter)?,
            callee: getter.pretty(true),
        };
        let instr = NewInstr::new(InstrKind::Invoke(invoke), DataType::Reference)
            .with_inputs(inputs)
            .with_environment(Some(self.entry_environment()));
        let id = self.graph.insert_before(anchor, instr)?;

        self.state.injected.insert(id);
        self.state.codelib_instance = Some(id);
        debug!(instance = %id, getter = %getter, "created codelib instance call");
        Ok(id)
    }

    /// Environment for a call inserted next to `anchor`: the anchor's own,
    /// else the closest one before it in the block, else the entry state.
    fn environment_at(&self, anchor: InstrId) -> Environment {
        if let Some(env) = self.graph.environment(anchor) {
            return env.clone();
        }
        let instrs = self.graph.block_instructions(self.graph.block_of(anchor));
        let at = instrs.iter().position(|&i| i == anchor).unwrap_or(instrs.len());
        instrs[..at]
            .iter()
            .rev()
            .find_map(|&i| self.graph.environment(i))
            .cloned()
            .unwrap_or_else(|| self.entry_environment())
    }

    fn entry_environment(&self) -> Environment {
        Environment::new(0, self.graph.parameters().iter().copied().map(Some).collect())
    }
}

fn check_assignable(signature: &MethodSignature, index: usize, actual: DataType, expected: DataType) -> Result<()> {
    if actual.is_assignable_to(expected) {
        Ok(())
    } else {
        Err(Error::malformed(
            signature,
            format!("argument {index} is {actual}, expected {expected}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_dex::{CompilationUnit, DexFile, MethodIdx};
    use graft_ir::{Graph, GraphBuilder, VisitorKey};

    use crate::HostVersion;

    struct Lib {
        methods: Vec<MethodSignature>,
    }

    impl Codelib for Lib {
        fn class_descriptor(&self) -> &str {
            "LLog;"
        }

        fn methods(&self) -> &[MethodSignature] {
            &self.methods
        }
    }

    fn sig(name: &str, proto: &str) -> MethodSignature {
        MethodSignature::static_method("LLog;", name, proto).unwrap()
    }

    fn setup() -> (Graph, MethodInfo, Lib, CodelibSymbols) {
        let mut b = GraphBuilder::new();
        b.this_parameter();
        let x = b.parameter(DataType::Int);
        b.ret(x).unwrap();
        let graph = b.build().unwrap();

        let method = MethodSignature::virtual_method("Lcom/app/Main;", "get", "(I)I").unwrap();
        let unit = CompilationUnit::new("base.apk", MethodIdx(0), method);
        let info = MethodInfo::new(&graph, &unit);

        let lib = Lib {
            methods: vec![sig("trace", "()V"), sig("value", "(I)V")],
        };
        let mut dex = DexFile::builder("base.apk");
        for m in &lib.methods {
            dex.add_method(m);
        }
        let symbols = CodelibSymbols::resolve(&dex.build(), &lib).unwrap();
        (graph, info, lib, symbols)
    }

    fn run(graph: &mut Graph, info: &MethodInfo, lib: &Lib, symbols: &CodelibSymbols, injections: &[Injection]) -> Result<usize> {
        let mut state = InjectionState::new();
        InjectionVisitor::new(
            graph,
            info,
            lib,
            symbols,
            HostAdapter::new(HostVersion::Oreo),
            &mut state,
        )
        .run(injections)
    }

    #[test]
    fn test_return_value_argument() {
        let (mut graph, info, lib, symbols) = setup();
        let injection = Injection::new(
            sig("value", "(I)V"),
            vec![Parameter::ReturnValue],
            vec![Target::method_end()],
        );
        assert_eq!(run(&mut graph, &info, &lib, &symbols, &[injection]).unwrap(), 1);

        let ret = graph
            .iter()
            .find(|(_, i)| i.kind == InstrKind::Return)
            .map(|(id, _)| id)
            .unwrap();
        let call = graph
            .iter()
            .find(|(_, i)| i.kind.as_invoke().is_some())
            .map(|(_, i)| i.clone())
            .unwrap();
        assert_eq!(call.inputs, graph.inputs(ret).to_vec());
    }

    #[test]
    fn test_wrong_arity_leaves_graph_untouched() {
        let (mut graph, info, lib, symbols) = setup();
        let before = graph.clone();
        let injection = Injection::new(sig("value", "(I)V"), vec![], vec![Target::method_end()]);
        let err = run(&mut graph, &info, &lib, &symbols, &[injection]).unwrap_err();
        assert!(matches!(err, Error::MalformedInjection { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let (mut graph, info, lib, symbols) = setup();
        let injection = Injection::new(
            sig("value", "(I)V"),
            vec![Parameter::Double(1.0)],
            vec![Target::method_end()],
        );
        let err = run(&mut graph, &info, &lib, &symbols, &[injection]).unwrap_err();
        assert!(err.to_string().contains("expected int"));
    }

    #[test]
    fn test_after_terminator_rejected_before_mutation() {
        let (mut graph, info, lib, symbols) = setup();
        let before = graph.clone();
        let injections = [
            Injection::new(sig("trace", "()V"), vec![], vec![Target::method_start()]),
            Injection::new(
                sig("trace", "()V"),
                vec![],
                vec![Target::generic(VisitorKey::Return).with_placement(Placement::After)],
            ),
        ];
        assert!(run(&mut graph, &info, &lib, &symbols, &injections).is_err());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_unknown_value_rejected() {
        let (mut graph, info, lib, symbols) = setup();
        let injection = Injection::new(
            sig("value", "(I)V"),
            vec![Parameter::Value(InstrId(1000))],
            vec![Target::method_end()],
        );
        assert!(matches!(
            run(&mut graph, &info, &lib, &symbols, &[injection]),
            Err(Error::MalformedInjection { .. })
        ));
    }

    #[test]
    fn test_unregistered_signature_rejected() {
        let (mut graph, info, lib, symbols) = setup();
        let virtual_trace = MethodSignature::virtual_method("LLog;", "trace", "()V").unwrap();
        let injection = Injection::new(virtual_trace, vec![], vec![Target::method_end()]);
        // Only the static `trace` is registered.
        assert!(matches!(
            run(&mut graph, &info, &lib, &symbols, &[injection]),
            Err(Error::UnregisteredSignature(_))
        ));
    }
}
