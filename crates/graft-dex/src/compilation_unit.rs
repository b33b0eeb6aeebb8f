//! Compilation unit context handed over by the host for each method.

use crate::signature::{MethodSignature, TypeDescriptor};
use crate::types::MethodIdx;

/// The method currently being compiled, as the host describes it.
#[derive(Clone, Debug)]
pub struct CompilationUnit {
    dex_location: String,
    method_idx: MethodIdx,
    signature: MethodSignature,
}

impl CompilationUnit {
    pub fn new(dex_location: &str, method_idx: MethodIdx, signature: MethodSignature) -> Self {
        Self {
            dex_location: dex_location.to_string(),
            method_idx,
            signature,
        }
    }

    /// Location of the dex file declaring the method.
    pub fn dex_location(&self) -> &str {
        &self.dex_location
    }

    pub fn method_idx(&self) -> MethodIdx {
        self.method_idx
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn is_static(&self) -> bool {
        self.signature.is_static()
    }

    /// Declared parameter types, excluding the receiver.
    pub fn param_types(&self) -> &[TypeDescriptor] {
        self.signature.proto().params()
    }
}
