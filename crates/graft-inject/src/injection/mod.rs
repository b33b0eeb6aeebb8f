//! Declarative injection requests and the visitor that applies them.

mod parameter;
mod target;
mod visitor;

pub use parameter::*;
pub use target::*;
pub use visitor::*;

use std::fmt;

use graft_dex::MethodSignature;

/// "Call `signature` with `parameters` at every `targets` location."
///
/// Produced fresh per method by a module and consumed by the
/// [`InjectionVisitor`] right away.
#[derive(Clone, Debug, PartialEq)]
pub struct Injection {
    signature: MethodSignature,
    parameters: Vec<Parameter>,
    targets: Vec<Target>,
}

impl Injection {
    pub const fn new(signature: MethodSignature, parameters: Vec<Parameter>, targets: Vec<Target>) -> Self {
        Self {
            signature,
            parameters,
            targets,
        }
    }

    pub const fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}

impl fmt::Display for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at [", self.signature)?;
        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{target}")?;
        }
        f.write_str("]")
    }
}
