//! Method exit tracing.

use graft_dex::MethodSignature;
use graft_ir::HostGraph;
use tracing::trace;

use crate::injection::{GENERIC_TARGET, Injection, Target};
use crate::{Codelib, MethodInfo, Module, ModuleFactory, Result};

/// Codelib class of the trace module.
pub const TRACE_CODELIB_CLASS: &str = "Lsaarland/cispa/artist/codelib/CodeLib;";

/// The codelib the trace module calls into: an instance `traceLog()` reached
/// through the static `getInstance()`.
#[derive(Clone, Debug)]
pub struct TraceCodelib {
    trace_log: MethodSignature,
    methods: Vec<MethodSignature>,
    instance_getter: MethodSignature,
}

impl TraceCodelib {
    pub fn new() -> Result<Self> {
        let trace_log = MethodSignature::virtual_method(TRACE_CODELIB_CLASS, "traceLog", "()V")?;
        Ok(Self {
            methods: vec![trace_log.clone()],
            trace_log,
            instance_getter: MethodSignature::static_method(
                TRACE_CODELIB_CLASS,
                "getInstance",
                &format!("(){TRACE_CODELIB_CLASS}"),
            )?,
        })
    }

    pub const fn trace_log(&self) -> &MethodSignature {
        &self.trace_log
    }
}

impl Codelib for TraceCodelib {
    fn class_descriptor(&self) -> &str {
        TRACE_CODELIB_CLASS
    }

    fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    fn instance_getter(&self) -> Option<&MethodSignature> {
        Some(&self.instance_getter)
    }
}

/// Calls `traceLog()` before every return of every method.
pub struct TraceModule {
    trace_log: MethodSignature,
}

impl TraceModule {
    pub const NAME: &'static str = "trace";

    pub const fn new(trace_log: MethodSignature) -> Self {
        Self { trace_log }
    }

    /// Factory creating a trace module per method.
    pub fn factory(codelib: &TraceCodelib) -> Box<dyn ModuleFactory> {
        let trace_log = codelib.trace_log().clone();
        Box::new(move |_: &MethodInfo| -> Box<dyn Module> { Box::new(Self::new(trace_log.clone())) })
    }
}

impl Module for TraceModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn provide_injections(&self, method: &MethodInfo, _graph: &dyn HostGraph) -> Vec<Injection> {
        trace!(method = %method, "trace module");
        vec![Injection::new(
            self.trace_log.clone(),
            Vec::new(),
            vec![Target::method_end().for_method(GENERIC_TARGET)],
        )]
    }
}
