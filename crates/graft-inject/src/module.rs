//! Instrumentation module interface.

use graft_ir::HostGraph;

use crate::MethodInfo;
use crate::injection::Injection;

/// A pluggable instrumentation policy.
///
/// A fresh module is created for every compiled method. The pass then calls
/// [`filter_eligible`](Self::filter_eligible), [`setup`](Self::setup) and
/// [`provide_injections`](Self::provide_injections) in that order.
pub trait Module: Send {
    /// Module name for logs.
    fn name(&self) -> &str;

    /// Whether this module wants to touch the method at all.
    fn filter_eligible(&self, _method: &MethodInfo) -> bool {
        true
    }

    /// Prepare module-local state before injections are requested.
    fn setup(&mut self, _method: &MethodInfo) {}

    /// Injection requests for the method, applied in order.
    fn provide_injections(&self, method: &MethodInfo, graph: &dyn HostGraph) -> Vec<Injection>;
}

/// Creates a [`Module`] for each method.
pub trait ModuleFactory: Send + Sync {
    fn create(&self, method: &MethodInfo) -> Box<dyn Module>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&MethodInfo) -> Box<dyn Module> + Send + Sync,
{
    fn create(&self, method: &MethodInfo) -> Box<dyn Module> {
        self(method)
    }
}
