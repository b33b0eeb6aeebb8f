//! Per-method pass driving all modules.

use std::fmt;
use std::sync::Arc;

use graft_dex::{CompilationUnit, ReferenceTable};
use graft_ir::HostGraph;
use tracing::{debug, info, info_span};

use crate::injection::{InjectionState, InjectionVisitor};
use crate::symbols::CodelibSymbols;
use crate::{CodelibEnvironment, MethodInfo, ModuleFactory, Result, Session, abort_compilation, metrics};

/// Lifecycle of a [`ModulePass`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Constructed,
    Filtering,
    Setup,
    Running,
    Finished,
}

/// Why a method was left alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Blacklisted,
    /// The method belongs to the codelib itself.
    Codelib,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::Codelib => "codelib",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a pass over one method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Skipped(SkipReason),
    Instrumented { method_number: u32, calls: usize },
}

/// Runs every module over one method.
///
/// Global filters come first: blacklisted methods and methods of the codelib
/// file finish right away without touching the graph. Each module is then
/// filtered, set up and asked for injections, which are applied immediately.
/// The codelib instance call and injected-node bookkeeping are shared by all
/// modules of the pass.
pub struct ModulePass<'a> {
    session: &'a Session,
    codelib: &'a CodelibEnvironment,
    factories: &'a [Box<dyn ModuleFactory>],
    graph: &'a mut dyn HostGraph,
    dex: &'a dyn ReferenceTable,
    method: MethodInfo,
    state: PassState,
    injection: InjectionState,
    symbols: Option<Arc<CodelibSymbols>>,
}

impl<'a> ModulePass<'a> {
    pub fn new(
        session: &'a Session,
        codelib: &'a CodelibEnvironment,
        factories: &'a [Box<dyn ModuleFactory>],
        graph: &'a mut dyn HostGraph,
        unit: &CompilationUnit,
        dex: &'a dyn ReferenceTable,
    ) -> Self {
        session.log_version_once();
        let method = MethodInfo::new(&*graph, unit);
        Self {
            session,
            codelib,
            factories,
            graph,
            dex,
            method,
            state: PassState::Constructed,
            injection: InjectionState::new(),
            symbols: None,
        }
    }

    pub const fn state(&self) -> PassState {
        self.state
    }

    pub const fn method(&self) -> &MethodInfo {
        &self.method
    }

    /// The graph of the method being compiled.
    pub fn graph(&self) -> &dyn HostGraph {
        &*self.graph
    }

    /// Codelib calls inserted so far.
    pub const fn calls(&self) -> usize {
        self.injection.calls()
    }

    /// Run the pass. Any error aborts compilation of the method.
    pub fn run(&mut self) -> Result<PassOutcome> {
        let name = self.method.method_name(true);
        let _span = info_span!("module_pass", method = %name).entered();
        self.run_modules()
            .map_err(|e| abort_compilation(&name, e))
    }

    fn run_modules(&mut self) -> Result<PassOutcome> {
        let mut modules: Vec<_> = self
            .factories
            .iter()
            .map(|factory| factory.create(&self.method))
            .collect();

        self.state = PassState::Filtering;
        if let Some(reason) = self.skip_reason() {
            self.state = PassState::Finished;
            self.session.record_skip();
            metrics::record_skipped(reason);
            debug!(method = %self.method, %reason, "skipping method");
            return Ok(PassOutcome::Skipped(reason));
        }

        for module in &mut modules {
            self.state = PassState::Filtering;
            if !module.filter_eligible(&self.method) {
                debug!(module = module.name(), "module not eligible");
                continue;
            }

            self.state = PassState::Setup;
            module.setup(&self.method);

            self.state = PassState::Running;
            let injections = module.provide_injections(&self.method, &*self.graph);
            if injections.is_empty() {
                continue;
            }
            let symbols = self.symbols()?;
            let calls = InjectionVisitor::new(
                &mut *self.graph,
                &self.method,
                self.codelib.codelib(),
                &symbols,
                self.session.adapter(),
                &mut self.injection,
            )
            .run(&injections)?;
            debug!(module = module.name(), injections = injections.len(), calls, "module done");
        }

        self.state = PassState::Finished;
        let calls = self.injection.calls();
        let method_number = self.session.next_method_number();
        self.session.record_calls(calls);
        metrics::record_instrumented(calls);
        info!(
            method_number,
            method = %self.method.method_name(true),
            location = self.method.unit().dex_location(),
            calls,
            "instrumented method"
        );
        Ok(PassOutcome::Instrumented {
            method_number,
            calls,
        })
    }

    fn skip_reason(&self) -> Option<SkipReason> {
        if self.session.is_blacklisted(&self.method.method_name(false)) {
            Some(SkipReason::Blacklisted)
        } else if self.session.is_codelib(self.method.unit().dex_location()) {
            Some(SkipReason::Codelib)
        } else {
            None
        }
    }

    fn symbols(&mut self) -> Result<Arc<CodelibSymbols>> {
        if let Some(symbols) = &self.symbols {
            return Ok(Arc::clone(symbols));
        }
        let symbols = self.codelib.symbols(self.dex)?;
        self.symbols = Some(Arc::clone(&symbols));
        Ok(symbols)
    }
}
