//! Per-method descriptor.

use std::fmt;

use graft_dex::{CompilationUnit, MethodSignature, TypeDescriptor};
use graft_ir::{HostGraph, InstrId};
use tracing::warn;

/// Read-only view of the method being compiled.
///
/// Captured once when a pass starts. Parameter values are listed receiver
/// first for instance methods; declared parameter types never include the
/// receiver, so the receiver sits at slot -1 relative to them.
#[derive(Clone, Debug)]
pub struct MethodInfo {
    unit: CompilationUnit,
    params: Vec<InstrId>,
    receiver: Option<InstrId>,
}

impl MethodInfo {
    pub fn new<G: HostGraph + ?Sized>(graph: &G, unit: &CompilationUnit) -> Self {
        let params = graph.parameters().to_vec();
        let receiver = if unit.is_static() {
            None
        } else {
            find_receiver(graph, &params, unit.signature())
        };
        Self {
            unit: unit.clone(),
            params,
            receiver,
        }
    }

    pub const fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    pub fn signature(&self) -> &MethodSignature {
        self.unit.signature()
    }

    /// Method name, optionally with return and parameter types.
    pub fn method_name(&self, with_signature: bool) -> String {
        self.unit.signature().pretty(with_signature)
    }

    pub fn is_static(&self) -> bool {
        self.unit.is_static()
    }

    /// All parameter values, receiver first for instance methods.
    pub fn params(&self) -> &[InstrId] {
        &self.params
    }

    /// Parameter values of the declared parameters, without the receiver.
    pub fn declared_params(&self) -> &[InstrId] {
        match self.receiver {
            Some(_) => self.params.get(1..).unwrap_or_default(),
            None => &self.params,
        }
    }

    /// Declared parameter types, without the receiver.
    pub fn param_types(&self) -> &[TypeDescriptor] {
        self.unit.param_types()
    }

    /// Declared parameter type names in source form (`java.lang.String`).
    pub fn param_type_names(&self) -> Vec<String> {
        self.param_types().iter().map(TypeDescriptor::pretty).collect()
    }

    /// The receiver value of an instance method.
    pub const fn receiver(&self) -> Option<InstrId> {
        self.receiver
    }

    pub fn is_this_parameter(&self, param: InstrId) -> bool {
        self.receiver == Some(param)
    }

    /// Check whether `param` is a declared `java.lang.String` parameter.
    pub fn is_string_param(&self, param: InstrId) -> bool {
        let Some(position) = self.params.iter().position(|&p| p == param) else {
            return false;
        };
        let declared = if self.is_static() {
            Some(position)
        } else {
            position.checked_sub(1)
        };
        declared
            .and_then(|i| self.param_types().get(i))
            .is_some_and(TypeDescriptor::is_string)
    }
}

/// Identify the receiver among the parameter values of an instance method.
///
/// An explicit receiver flag wins. Without one, the only parameter the host
/// proves non-null is taken as the receiver. As a last resort the first
/// parameter is used.
fn find_receiver<G: HostGraph + ?Sized>(
    graph: &G,
    params: &[InstrId],
    signature: &MethodSignature,
) -> Option<InstrId> {
    if let Some(&flagged) = params
        .iter()
        .find(|&&p| graph.parameter_is_receiver(p) == Some(true))
    {
        return Some(flagged);
    }

    let has_flags = params
        .iter()
        .any(|&p| graph.parameter_is_receiver(p).is_some());
    if !has_flags {
        let mut non_null = params.iter().filter(|&&p| !graph.can_be_null(p));
        if let (Some(&receiver), None) = (non_null.next(), non_null.next()) {
            return Some(receiver);
        }
    }

    let first = params.first().copied();
    warn!(
        method = %signature,
        "could not identify receiver parameter, using the first parameter"
    );
    first
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodInfo {{ method: ")?;
        if self.is_static() {
            f.write_str("static ")?;
        }
        write!(f, "{} }}", self.method_name(true))
    }
}
