//! Parallel method driver.
//!
//! Plays the host compiler: each worker thread owns one method graph at a
//! time while the session, codelib symbols and module factories are shared.

use std::sync::Arc;

use graft_dex::{CompilationUnit, DexFile};
use graft_inject::{
    Codelib, CodelibEnvironment, GraftConfig, ModuleFactory, ModulePass, PassOutcome, Result,
    Session, SessionStats, abort_compilation,
};
use graft_ir::{Graph, verify};
use rayon::prelude::*;
use tracing::{debug, info};

/// One method waiting to be compiled.
#[derive(Clone, Debug)]
pub struct MethodUnit {
    pub graph: Graph,
    pub unit: CompilationUnit,
    pub dex: Arc<DexFile>,
}

impl MethodUnit {
    pub const fn new(graph: Graph, unit: CompilationUnit, dex: Arc<DexFile>) -> Self {
        Self { graph, unit, dex }
    }
}

/// Instruments methods with a fixed set of modules.
pub struct Instrumenter {
    session: Session,
    codelib: CodelibEnvironment,
    factories: Vec<Box<dyn ModuleFactory>>,
}

impl Instrumenter {
    pub fn new(config: GraftConfig, codelib: Arc<dyn Codelib>) -> Result<Self> {
        Ok(Self {
            session: Session::new(config)?,
            codelib: CodelibEnvironment::new(codelib),
            factories: Vec::new(),
        })
    }

    /// Register a module. Modules run in registration order.
    #[must_use]
    pub fn with_module(mut self, factory: Box<dyn ModuleFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn register(&mut self, factory: Box<dyn ModuleFactory>) {
        self.factories.push(factory);
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn codelib(&self) -> &CodelibEnvironment {
        &self.codelib
    }

    pub fn num_modules(&self) -> usize {
        self.factories.len()
    }

    /// Instrument one method, verifying the graph afterwards when configured.
    pub fn instrument(&self, method: &mut MethodUnit) -> Result<PassOutcome> {
        let outcome = ModulePass::new(
            &self.session,
            &self.codelib,
            &self.factories,
            &mut method.graph,
            &method.unit,
            method.dex.as_ref(),
        )
        .run()?;

        if self.session.config().verify_graphs && matches!(outcome, PassOutcome::Instrumented { .. }) {
            verify(&method.graph).map_err(|e| {
                abort_compilation(&method.unit.signature().pretty(true), e.into())
            })?;
            debug!(method = %method.unit.signature(), "graph verified");
        }
        Ok(outcome)
    }

    /// Instrument methods in parallel. Results are in input order.
    pub fn instrument_all(&self, methods: &mut [MethodUnit]) -> Vec<Result<PassOutcome>> {
        info!(methods = methods.len(), modules = self.factories.len(), "instrumenting");
        methods
            .par_iter_mut()
            .map(|method| self.instrument(method))
            .collect()
    }

    /// End the session.
    pub fn finish(self) -> SessionStats {
        self.session.finish()
    }
}
