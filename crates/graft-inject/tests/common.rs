#![allow(dead_code)]

use std::sync::Arc;

use graft_dex::{CompilationUnit, DataType, DexFile, MethodIdx, MethodSignature};
use graft_inject::{
    Codelib, CodelibEnvironment, Injection, MethodInfo, Module, ModuleFactory, ModulePass,
    PassOutcome, Result, Session,
};
use graft_ir::{Graph, GraphBuilder, HostGraph, InstrId, InstrKind, InvokeKind};

pub const LOG: &str = "LLog;";
pub const APP_DEX: &str = "/data/app/com.app/base.apk";

/// Test codelib: static `trace()`, `enter()`, `value(I)`, instance `mark(I)`
/// reached through `get()`.
pub struct LogLib {
    methods: Vec<MethodSignature>,
    getter: MethodSignature,
}

impl LogLib {
    pub fn new() -> Self {
        Self {
            methods: vec![trace(), enter(), value(), mark()],
            getter: MethodSignature::static_method(LOG, "get", "()LLog;").expect("getter"),
        }
    }

    pub fn getter(&self) -> &MethodSignature {
        &self.getter
    }
}

impl Codelib for LogLib {
    fn class_descriptor(&self) -> &str {
        LOG
    }

    fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    fn instance_getter(&self) -> Option<&MethodSignature> {
        Some(&self.getter)
    }
}

pub fn trace() -> MethodSignature {
    MethodSignature::static_method(LOG, "trace", "()V").expect("trace")
}

pub fn enter() -> MethodSignature {
    MethodSignature::static_method(LOG, "enter", "()V").expect("enter")
}

pub fn value() -> MethodSignature {
    MethodSignature::static_method(LOG, "value", "(I)V").expect("value")
}

pub fn mark() -> MethodSignature {
    MethodSignature::virtual_method(LOG, "mark", "(I)V").expect("mark")
}

/// App dex file referencing every codelib symbol.
pub fn app_dex(lib: &LogLib) -> DexFile {
    let mut builder = DexFile::builder(APP_DEX);
    builder.add_type("Lcom/app/Main;");
    for method in lib.methods() {
        builder.add_method(method);
    }
    builder.add_method(lib.getter());
    builder.build()
}

pub fn codelib_env() -> (CodelibEnvironment, DexFile) {
    let lib = LogLib::new();
    let dex = app_dex(&lib);
    (CodelibEnvironment::new(Arc::new(lib)), dex)
}

/// `void com.app.Main.run(int)`: branches on its argument, calls
/// `work(int)` on one side and returns on both.
pub fn two_returns() -> Graph {
    let mut b = GraphBuilder::new();
    let this = b.this_parameter();
    let x = b.parameter(DataType::Int);
    let then = b.block();
    let otherwise = b.block();
    b.branch(x, then, otherwise).expect("branch");
    b.switch_to(then);
    b.invoke(
        InvokeKind::Virtual,
        "void com.app.Main.work(int)",
        DataType::Void,
        vec![this, x],
    )
    .expect("invoke");
    b.ret_void().expect("return");
    b.switch_to(otherwise);
    b.ret_void().expect("return");
    b.build().expect("graph")
}

/// `r = work(x)` in the body block, which jumps to a block returning `r`.
pub fn value_in_dominating_block() -> (Graph, InstrId) {
    let mut b = GraphBuilder::new();
    let this = b.this_parameter();
    let x = b.parameter(DataType::Int);
    let exit = b.block();
    let r = b
        .invoke(
            InvokeKind::Virtual,
            "int com.app.Main.work(int)",
            DataType::Int,
            vec![this, x],
        )
        .expect("invoke");
    b.goto(exit).expect("goto");
    b.switch_to(exit);
    b.ret(r).expect("return");
    (b.build().expect("graph"), r)
}

/// `r = work(x)` on one side of a branch only; both sides meet at a `return-void`.
pub fn value_on_one_branch() -> (Graph, InstrId) {
    let mut b = GraphBuilder::new();
    let this = b.this_parameter();
    let x = b.parameter(DataType::Int);
    let then = b.block();
    let otherwise = b.block();
    let join = b.block();
    b.branch(x, then, otherwise).expect("branch");
    b.switch_to(then);
    let r = b
        .invoke(
            InvokeKind::Virtual,
            "int com.app.Main.work(int)",
            DataType::Int,
            vec![this, x],
        )
        .expect("invoke");
    b.goto(join).expect("goto");
    b.switch_to(otherwise);
    b.goto(join).expect("goto");
    b.switch_to(join);
    b.ret_void().expect("return");
    (b.build().expect("graph"), r)
}

pub fn run_unit() -> CompilationUnit {
    unit_in(APP_DEX)
}

pub fn unit_in(location: &str) -> CompilationUnit {
    let signature = MethodSignature::virtual_method("Lcom/app/Main;", "run", "(I)V").expect("signature");
    CompilationUnit::new(location, MethodIdx(7), signature)
}

/// Module that returns a fixed list of injections.
pub struct Fixed {
    injections: Vec<Injection>,
    eligible: bool,
}

impl Module for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn filter_eligible(&self, _method: &MethodInfo) -> bool {
        self.eligible
    }

    fn provide_injections(&self, _method: &MethodInfo, _graph: &dyn HostGraph) -> Vec<Injection> {
        self.injections.clone()
    }
}

pub fn module(injections: Vec<Injection>) -> Box<dyn ModuleFactory> {
    Box::new(move |_: &MethodInfo| -> Box<dyn Module> {
        Box::new(Fixed {
            injections: injections.clone(),
            eligible: true,
        })
    })
}

pub fn ineligible_module(injections: Vec<Injection>) -> Box<dyn ModuleFactory> {
    Box::new(move |_: &MethodInfo| -> Box<dyn Module> {
        Box::new(Fixed {
            injections: injections.clone(),
            eligible: false,
        })
    })
}

pub fn run_pass(
    session: &Session,
    env: &CodelibEnvironment,
    factories: &[Box<dyn ModuleFactory>],
    graph: &mut Graph,
    unit: &CompilationUnit,
    dex: &DexFile,
) -> Result<PassOutcome> {
    ModulePass::new(session, env, factories, graph, unit, dex).run()
}

/// Calls whose callee name contains `name`, in graph order.
pub fn calls_to(graph: &Graph, name: &str) -> Vec<InstrId> {
    let mut calls = Vec::new();
    for block in graph.blocks() {
        for &id in graph.block_instructions(block) {
            if let InstrKind::Invoke(invoke) = graph.kind(id) {
                if invoke.callee.contains(name) {
                    calls.push(id);
                }
            }
        }
    }
    calls
}

/// Instruction right before `instr` in its block.
pub fn previous(graph: &Graph, instr: InstrId) -> Option<InstrId> {
    let instrs = graph.block_instructions(graph.block_of(instr));
    let pos = instrs.iter().position(|&i| i == instr)?;
    pos.checked_sub(1).map(|p| instrs[p])
}

pub fn returns(graph: &Graph) -> Vec<InstrId> {
    graph
        .iter()
        .filter(|(_, instr)| instr.kind.is_return())
        .map(|(id, _)| id)
        .collect()
}
