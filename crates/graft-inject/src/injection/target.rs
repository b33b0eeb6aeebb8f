use std::fmt;

use graft_ir::{InstrKind, VisitorKey};

/// Method filter that selects every method.
pub const GENERIC_TARGET: &str = "*";

/// Where an injected call goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// Every node selected by the key.
    Generic(VisitorKey),
    /// Once, at the end of the entry block, after all parameters are defined.
    MethodStart,
    /// Before every `Return` and `ReturnVoid`.
    MethodEnd,
    /// Nodes selected by the key whose callee (or node name) contains `pattern`.
    Custom { key: VisitorKey, pattern: String },
}

/// Side of the anchor node the call is inserted on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    #[default]
    Before,
    After,
}

/// One insertion point of an [`Injection`](super::Injection).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    method: String,
    kind: TargetKind,
    placement: Placement,
    shared: bool,
}

impl Target {
    pub const fn new(kind: TargetKind) -> Self {
        Self {
            method: String::new(),
            kind,
            placement: Placement::Before,
            shared: false,
        }
    }

    pub const fn method_start() -> Self {
        Self::new(TargetKind::MethodStart)
    }

    pub const fn method_end() -> Self {
        Self::new(TargetKind::MethodEnd)
    }

    pub const fn generic(key: VisitorKey) -> Self {
        Self::new(TargetKind::Generic(key))
    }

    pub fn custom(key: VisitorKey, pattern: &str) -> Self {
        Self::new(TargetKind::Custom {
            key,
            pattern: pattern.to_string(),
        })
    }

    /// Restrict the target to methods whose pretty signature contains `filter`.
    /// [`GENERIC_TARGET`] (the default) selects every method.
    #[must_use]
    pub fn for_method(mut self, filter: &str) -> Self {
        self.method = if filter == GENERIC_TARGET {
            String::new()
        } else {
            filter.to_string()
        };
        self
    }

    /// Insert after the anchor instead of before it. Only meaningful for
    /// generic and custom targets.
    #[must_use]
    pub const fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Share the call with identical method-start requests of other modules
    /// in the same pass, so only one call node is emitted.
    #[must_use]
    pub const fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub const fn kind(&self) -> &TargetKind {
        &self.kind
    }

    pub const fn placement(&self) -> Placement {
        match self.kind {
            TargetKind::MethodStart | TargetKind::MethodEnd => Placement::Before,
            _ => self.placement,
        }
    }

    pub const fn is_shared(&self) -> bool {
        self.shared && matches!(self.kind, TargetKind::MethodStart)
    }

    pub fn method_filter(&self) -> &str {
        if self.method.is_empty() {
            GENERIC_TARGET
        } else {
            &self.method
        }
    }

    /// Check whether the target applies to a method, by pretty signature.
    pub fn applies_to(&self, method_name: &str) -> bool {
        self.method.is_empty() || method_name.contains(self.method.as_str())
    }

    /// Check whether a non-entry node is an anchor for this target.
    pub fn matches(&self, kind: &InstrKind) -> bool {
        match &self.kind {
            TargetKind::MethodStart => false,
            TargetKind::MethodEnd => kind.is_return(),
            TargetKind::Generic(key) => key.matches(kind),
            TargetKind::Custom { key, pattern } => {
                key.matches(kind)
                    && kind
                        .as_invoke()
                        .map_or(kind.name(), |invoke| invoke.callee.as_str())
                        .contains(pattern.as_str())
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TargetKind::Generic(key) => write!(f, "GENERIC({key})")?,
            TargetKind::MethodStart => f.write_str("METHOD_START")?,
            TargetKind::MethodEnd => f.write_str("METHOD_END")?,
            TargetKind::Custom { key, pattern } => write!(f, "CUSTOM({key}, {pattern:?})")?,
        }
        write!(f, " in {}", self.method_filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_dex::{MethodIdx, TypeIdx};
    use graft_ir::{Invoke, InvokeKind};

    fn invoke(kind: InvokeKind, callee: &str) -> InstrKind {
        InstrKind::Invoke(Invoke {
            kind,
            type_idx: TypeIdx(0),
            method_idx: MethodIdx(0),
            callee: callee.to_string(),
        })
    }

    #[test]
    fn test_method_end_matches_both_returns() {
        let target = Target::method_end();
        assert!(target.matches(&InstrKind::Return));
        assert!(target.matches(&InstrKind::ReturnVoid));
        assert!(!target.matches(&InstrKind::Goto));
    }

    #[test]
    fn test_custom_pattern() {
        let target = Target::custom(VisitorKey::InvokeVirtual, "android.util.Log.d");
        assert!(target.matches(&invoke(
            InvokeKind::Virtual,
            "int android.util.Log.d(java.lang.String, java.lang.String)"
        )));
        assert!(!target.matches(&invoke(InvokeKind::Virtual, "void com.app.Main.run()")));
        assert!(!target.matches(&invoke(
            InvokeKind::StaticOrDirect,
            "int android.util.Log.d(java.lang.String, java.lang.String)"
        )));
    }

    #[test]
    fn test_method_filter() {
        let target = Target::method_end().for_method("com.app.Main.onCreate");
        assert!(target.applies_to("void com.app.Main.onCreate(android.os.Bundle)"));
        assert!(!target.applies_to("void com.app.Main.onStop()"));

        let generic = Target::method_end().for_method(GENERIC_TARGET);
        assert_eq!(generic.method_filter(), GENERIC_TARGET);
        assert!(generic.applies_to("anything"));
    }

    #[test]
    fn test_placement_fixed_for_method_targets() {
        let target = Target::method_end().with_placement(Placement::After);
        assert_eq!(target.placement(), Placement::Before);
        let generic = Target::generic(VisitorKey::Invoke).with_placement(Placement::After);
        assert_eq!(generic.placement(), Placement::After);
    }

    #[test]
    fn test_shared_only_for_method_start() {
        assert!(Target::method_start().shared().is_shared());
        assert!(!Target::method_end().shared().is_shared());
    }
}
