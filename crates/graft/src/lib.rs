//! Graft - compile-time bytecode instrumentation
//!
//! Splices calls into a side-loaded codelib into method graphs while they are
//! being compiled.
//!
//! # Example
//!
//! ```ignore
//! use graft::{GraftConfig, Instrumenter, TraceCodelib, TraceModule};
//!
//! graft::logging::init(graft::logging::DEFAULT_DIRECTIVE);
//! let trace = TraceCodelib::new()?;
//! let instrumenter = Instrumenter::new(GraftConfig::default(), Arc::new(trace.clone()))?
//!     .with_module(TraceModule::factory(&trace));
//! let results = instrumenter.instrument_all(&mut methods);
//! let stats = instrumenter.finish();
//! ```

// Re-export from sub-crates
pub use graft_dex::{
    CallKind, CompilationUnit, DataType, DexFile, DexFileBuilder, MethodIdx, MethodSignature,
    Proto, ReferenceTable, SignatureError, TypeDescriptor, TypeIdx,
};
pub use graft_inject::{
    Codelib, CodelibEnvironment, CodelibSymbols, Error, GENERIC_TARGET, GraftConfig, HostAdapter,
    HostVersion, Injection, MethodInfo, Module, ModuleFactory, ModulePass, Parameter, PassOutcome,
    PassState, Placement, Result, Session, SessionStats, SkipReason, Target, TargetKind,
    TraceCodelib, TraceModule, abort_compilation,
};
pub use graft_ir::{
    BinaryOp, BlockId, Constant, Dominators, Graph, GraphBuilder, GraphChecker, GraphError,
    HostGraph, InstrId, InstrKind, InvokeKind, VisitorKey, verify,
};

mod driver;
pub mod logging;

pub use driver::*;
