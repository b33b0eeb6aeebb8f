//! Per-file reference tables.

use rustc_hash::FxHashMap;

use crate::signature::{MethodSignature, Proto};
use crate::types::{MethodIdx, TypeIdx};

/// Constant-pool lookups the instrumentation core needs from a dex file.
///
/// Implemented by the host adapter; [`DexFile`] is the in-memory version.
pub trait ReferenceTable: Send + Sync {
    /// Location the file was loaded from. Used as the file's identity.
    fn location(&self) -> &str;

    /// Find the type index of a class by descriptor (`Lpkg/Cls;`).
    fn find_type_index(&self, descriptor: &str) -> Option<TypeIdx>;

    /// Find the method index of a method reference.
    fn find_method_index(&self, signature: &MethodSignature) -> Option<MethodIdx>;
}

/// Entry of the method table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodId {
    /// Declaring class.
    pub class_idx: TypeIdx,
    /// Method name.
    pub name: String,
    /// Prototype.
    pub proto: Proto,
}

/// In-memory dex reference tables.
#[derive(Clone, Debug, Default)]
pub struct DexFile {
    location: String,
    type_ids: Vec<String>,
    method_ids: Vec<MethodId>,
    type_lookup: FxHashMap<String, TypeIdx>,
    method_lookup: FxHashMap<MethodId, MethodIdx>,
}

impl DexFile {
    /// Start building a dex file with the given location.
    pub fn builder(location: &str) -> DexFileBuilder {
        DexFileBuilder {
            file: Self {
                location: location.to_string(),
                ..Self::default()
            },
        }
    }

    /// Type descriptor at `idx`.
    pub fn type_descriptor(&self, idx: TypeIdx) -> Option<&str> {
        self.type_ids.get(idx.0 as usize).map(String::as_str)
    }

    /// Method table entry at `idx`.
    pub fn method_id(&self, idx: MethodIdx) -> Option<&MethodId> {
        self.method_ids.get(idx.0 as usize)
    }

    pub fn num_types(&self) -> usize {
        self.type_ids.len()
    }

    pub fn num_methods(&self) -> usize {
        self.method_ids.len()
    }
}

impl ReferenceTable for DexFile {
    fn location(&self) -> &str {
        &self.location
    }

    fn find_type_index(&self, descriptor: &str) -> Option<TypeIdx> {
        self.type_lookup.get(descriptor).copied()
    }

    fn find_method_index(&self, signature: &MethodSignature) -> Option<MethodIdx> {
        let class_idx = self.find_type_index(signature.class())?;
        let key = MethodId {
            class_idx,
            name: signature.name().to_string(),
            proto: signature.proto().clone(),
        };
        self.method_lookup.get(&key).copied()
    }
}

/// Builder for [`DexFile`].
pub struct DexFileBuilder {
    file: DexFile,
}

impl DexFileBuilder {
    /// Add a type descriptor, returning its index. Duplicates share an index.
    pub fn add_type(&mut self, descriptor: &str) -> TypeIdx {
        if let Some(&idx) = self.file.type_lookup.get(descriptor) {
            return idx;
        }
        let idx = TypeIdx(u32::try_from(self.file.type_ids.len()).unwrap_or(u32::MAX));
        self.file.type_ids.push(descriptor.to_string());
        self.file.type_lookup.insert(descriptor.to_string(), idx);
        idx
    }

    /// Add a method reference (and its declaring class), returning its index.
    pub fn add_method(&mut self, signature: &MethodSignature) -> MethodIdx {
        let class_idx = self.add_type(signature.class());
        let id = MethodId {
            class_idx,
            name: signature.name().to_string(),
            proto: signature.proto().clone(),
        };
        if let Some(&idx) = self.file.method_lookup.get(&id) {
            return idx;
        }
        let idx = MethodIdx(u32::try_from(self.file.method_ids.len()).unwrap_or(u32::MAX));
        self.file.method_ids.push(id.clone());
        self.file.method_lookup.insert(id, idx);
        idx
    }

    /// Chaining form of [`add_type`](Self::add_type).
    #[must_use]
    pub fn with_type(mut self, descriptor: &str) -> Self {
        self.add_type(descriptor);
        self
    }

    /// Chaining form of [`add_method`](Self::add_method).
    #[must_use]
    pub fn with_method(mut self, signature: &MethodSignature) -> Self {
        self.add_method(signature);
        self
    }

    pub fn build(self) -> DexFile {
        self.file
    }
}
