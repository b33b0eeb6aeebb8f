//! Codelib symbol resolution against a target dex file.

use graft_dex::{MethodIdx, MethodSignature, ReferenceTable, TypeIdx};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::codelib::Codelib;
use crate::{Error, Result};

/// Type and method indices of the codelib, as seen from one dex file.
///
/// Built once per (dex file, codelib) pair. Every method the codelib declares
/// is resolved up front; an unresolvable symbol fails the whole table.
#[derive(Clone, Debug)]
pub struct CodelibSymbols {
    location: String,
    type_idx: TypeIdx,
    method_idx: FxHashMap<MethodSignature, MethodIdx>,
}

impl CodelibSymbols {
    /// Resolve all codelib symbols in `dex`.
    pub fn resolve(dex: &dyn ReferenceTable, codelib: &dyn Codelib) -> Result<Self> {
        let descriptor = codelib.class_descriptor();
        let type_idx = dex
            .find_type_index(descriptor)
            .ok_or_else(|| Error::TypeNotFound(descriptor.to_string()))?;

        let mut method_idx = FxHashMap::default();
        for signature in codelib.methods().iter().chain(codelib.instance_getter()) {
            let idx = dex
                .find_method_index(signature)
                .ok_or_else(|| Error::MethodNotFound(signature.to_string()))?;
            trace!(signature = %signature, idx = %idx, "resolved codelib method");
            method_idx.insert(signature.clone(), idx);
        }

        debug!(
            location = dex.location(),
            class = descriptor,
            type_idx = %type_idx,
            methods = method_idx.len(),
            "resolved codelib symbols"
        );
        Ok(Self {
            location: dex.location().to_string(),
            type_idx,
            method_idx,
        })
    }

    /// Location of the dex file the indices belong to.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Type index of the codelib class.
    pub const fn type_idx(&self) -> TypeIdx {
        self.type_idx
    }

    /// Method index of a codelib method.
    ///
    /// Asking for a signature the codelib never declared is a logic error in
    /// the calling module and is reported as [`Error::UnregisteredSignature`].
    pub fn method_idx(&self, signature: &MethodSignature) -> Result<MethodIdx> {
        self.method_idx
            .get(signature)
            .copied()
            .ok_or_else(|| Error::UnregisteredSignature(signature.to_string()))
    }

    pub fn len(&self) -> usize {
        self.method_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.method_idx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_dex::DexFile;

    struct LogLib {
        methods: Vec<MethodSignature>,
    }

    impl Codelib for LogLib {
        fn class_descriptor(&self) -> &str {
            "LLog;"
        }

        fn methods(&self) -> &[MethodSignature] {
            &self.methods
        }
    }

    fn trace_sig() -> MethodSignature {
        MethodSignature::static_method("LLog;", "trace", "()V").unwrap()
    }

    fn lib() -> LogLib {
        LogLib {
            methods: vec![trace_sig()],
        }
    }

    #[test]
    fn test_resolve_declared_methods() {
        let dex = DexFile::builder("/data/app/base.apk")
            .with_type("LFoo;")
            .with_method(&trace_sig())
            .build();
        let symbols = CodelibSymbols::resolve(&dex, &lib()).unwrap();

        assert_eq!(symbols.type_idx(), dex.find_type_index("LLog;").unwrap());
        let idx = symbols.method_idx(&trace_sig()).unwrap();
        assert_eq!(Some(idx), dex.find_method_index(&trace_sig()));
        // Stable across lookups.
        assert_eq!(symbols.method_idx(&trace_sig()).unwrap(), idx);
        assert_eq!(symbols.location(), "/data/app/base.apk");
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn test_unregistered_signature() {
        let dex = DexFile::builder("base.apk").with_method(&trace_sig()).build();
        let symbols = CodelibSymbols::resolve(&dex, &lib()).unwrap();

        let write = MethodSignature::static_method("LLog;", "write", "(I)V").unwrap();
        let err = symbols.method_idx(&write).unwrap_err();
        assert!(matches!(err, Error::UnregisteredSignature(_)));
        assert!(err.to_string().contains("Failed obtaining method idx"));
    }

    #[test]
    fn test_missing_type() {
        let dex = DexFile::builder("base.apk").with_type("LFoo;").build();
        let err = CodelibSymbols::resolve(&dex, &lib()).unwrap_err();
        assert!(matches!(err, Error::TypeNotFound(ref t) if t == "LLog;"));
    }

    #[test]
    fn test_missing_method() {
        let dex = DexFile::builder("base.apk").with_type("LLog;").build();
        let err = CodelibSymbols::resolve(&dex, &lib()).unwrap_err();
        assert!(matches!(err, Error::MethodNotFound(_)));
        assert_eq!(err.to_string(), "Could not find method idx for LLog;->trace()V");
    }
}
