//! The codelib: the side-loaded class injected calls target.

use std::sync::Arc;

use graft_dex::{MethodSignature, ReferenceTable};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::Result;
use crate::symbols::CodelibSymbols;

/// A codelib class and the methods it offers to instrumentation modules.
pub trait Codelib: Send + Sync {
    /// Class descriptor, e.g. `Lsaarland/cispa/artist/codelib/CodeLib;`.
    fn class_descriptor(&self) -> &str;

    /// Methods modules may inject calls to.
    fn methods(&self) -> &[MethodSignature];

    /// Static method returning the codelib instance.
    ///
    /// Required when any method in [`methods`](Self::methods) is virtual or
    /// interface dispatched. The instance is fetched once per method.
    fn instance_getter(&self) -> Option<&MethodSignature> {
        None
    }
}

/// Owns the codelib and the per-file symbol tables resolved for it.
///
/// Shared by all compiling threads. Tables are resolved on first use of a dex
/// file and handed out as [`Arc`]s afterwards.
pub struct CodelibEnvironment {
    codelib: Arc<dyn Codelib>,
    symbols: RwLock<FxHashMap<String, Arc<CodelibSymbols>>>,
}

impl CodelibEnvironment {
    pub fn new(codelib: Arc<dyn Codelib>) -> Self {
        Self {
            codelib,
            symbols: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn codelib(&self) -> &dyn Codelib {
        self.codelib.as_ref()
    }

    /// Symbol table for `dex`, resolving it on first request.
    pub fn symbols(&self, dex: &dyn ReferenceTable) -> Result<Arc<CodelibSymbols>> {
        if let Some(table) = self.symbols.read().get(dex.location()) {
            return Ok(Arc::clone(table));
        }

        // Resolve outside the lock; a racing thread may win, which is harmless.
        let resolved = Arc::new(CodelibSymbols::resolve(dex, self.codelib.as_ref())?);
        let mut tables = self.symbols.write();
        let table = tables
            .entry(dex.location().to_string())
            .or_insert_with(|| {
                debug!(location = dex.location(), "caching codelib symbols");
                resolved
            });
        Ok(Arc::clone(table))
    }

    /// Number of dex files with a resolved symbol table.
    pub fn cached_files(&self) -> usize {
        self.symbols.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_dex::DexFile;

    struct Lib(Vec<MethodSignature>);

    impl Codelib for Lib {
        fn class_descriptor(&self) -> &str {
            "LLog;"
        }

        fn methods(&self) -> &[MethodSignature] {
            &self.0
        }
    }

    #[test]
    fn test_symbols_cached_per_file() {
        let sig = MethodSignature::static_method("LLog;", "trace", "()V").unwrap();
        let env = CodelibEnvironment::new(Arc::new(Lib(vec![sig.clone()])));
        let a = DexFile::builder("a.dex").with_method(&sig).build();
        let b = DexFile::builder("b.dex")
            .with_type("LOther;")
            .with_method(&sig)
            .build();

        let first = env.symbols(&a).unwrap();
        let again = env.symbols(&a).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        let other = env.symbols(&b).unwrap();
        assert_ne!(first.type_idx(), other.type_idx());
        assert_eq!(env.cached_files(), 2);
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let sig = MethodSignature::static_method("LLog;", "trace", "()V").unwrap();
        let env = CodelibEnvironment::new(Arc::new(Lib(vec![sig])));
        let dex = DexFile::builder("empty.dex").build();
        assert!(env.symbols(&dex).is_err());
        assert_eq!(env.cached_files(), 0);
    }
}
