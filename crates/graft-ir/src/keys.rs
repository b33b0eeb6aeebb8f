//! Node-kind vocabulary used to match injection targets.

use std::fmt;

use crate::instr::{InstrKind, InvokeKind};

/// Kind of node an injection target can be keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisitorKey {
    /// Any invoke.
    Invoke,
    InvokeInterface,
    InvokeStaticOrDirect,
    InvokeVirtual,
    Return,
    ReturnVoid,
}

impl VisitorKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoke => "HInvoke",
            Self::InvokeInterface => "HInvokeInterface",
            Self::InvokeStaticOrDirect => "HInvokeStaticOrDirect",
            Self::InvokeVirtual => "HInvokeVirtual",
            Self::Return => "HReturn",
            Self::ReturnVoid => "HReturnVoid",
        }
    }

    /// Check whether a node of `kind` is selected by this key.
    pub const fn matches(self, kind: &InstrKind) -> bool {
        match (self, kind) {
            (Self::Invoke, InstrKind::Invoke(_))
            | (Self::Return, InstrKind::Return)
            | (Self::ReturnVoid, InstrKind::ReturnVoid) => true,
            (Self::InvokeInterface, InstrKind::Invoke(i)) => {
                matches!(i.kind, InvokeKind::Interface)
            }
            (Self::InvokeStaticOrDirect, InstrKind::Invoke(i)) => {
                matches!(i.kind, InvokeKind::StaticOrDirect)
            }
            (Self::InvokeVirtual, InstrKind::Invoke(i)) => matches!(i.kind, InvokeKind::Virtual),
            _ => false,
        }
    }

    /// Most specific key for a node, if it has one.
    pub const fn of(kind: &InstrKind) -> Option<Self> {
        match kind {
            InstrKind::Invoke(i) => Some(match i.kind {
                InvokeKind::StaticOrDirect => Self::InvokeStaticOrDirect,
                InvokeKind::Virtual => Self::InvokeVirtual,
                InvokeKind::Interface => Self::InvokeInterface,
            }),
            InstrKind::Return => Some(Self::Return),
            InstrKind::ReturnVoid => Some(Self::ReturnVoid),
            _ => None,
        }
    }
}

impl fmt::Display for VisitorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Invoke;
    use graft_dex::{MethodIdx, TypeIdx};

    fn invoke(kind: InvokeKind) -> InstrKind {
        InstrKind::Invoke(Invoke {
            kind,
            type_idx: TypeIdx(0),
            method_idx: MethodIdx(0),
            callee: String::new(),
        })
    }

    #[test]
    fn test_generic_invoke_key_matches_all_invokes() {
        for kind in [
            InvokeKind::StaticOrDirect,
            InvokeKind::Virtual,
            InvokeKind::Interface,
        ] {
            assert!(VisitorKey::Invoke.matches(&invoke(kind)));
        }
        assert!(!VisitorKey::Invoke.matches(&InstrKind::Return));
    }

    #[test]
    fn test_specific_keys() {
        assert!(VisitorKey::InvokeVirtual.matches(&invoke(InvokeKind::Virtual)));
        assert!(!VisitorKey::InvokeVirtual.matches(&invoke(InvokeKind::Interface)));
        assert!(VisitorKey::ReturnVoid.matches(&InstrKind::ReturnVoid));
        assert!(!VisitorKey::Return.matches(&InstrKind::ReturnVoid));
        assert_eq!(
            VisitorKey::of(&invoke(InvokeKind::Interface)),
            Some(VisitorKey::InvokeInterface)
        );
        assert_eq!(VisitorKey::of(&InstrKind::Goto), None);
    }
}
