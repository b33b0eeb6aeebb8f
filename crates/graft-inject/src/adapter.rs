//! Host release adapter.

use graft_dex::CallKind;
use graft_ir::InvokeKind;

use crate::config::HostVersion;

/// Per-release differences in how injected calls are lowered.
///
/// Chosen once from [`HostVersion`] when the session starts so that the
/// injection code is written once against this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostAdapter {
    version: HostVersion,
}

impl HostAdapter {
    pub const fn new(version: HostVersion) -> Self {
        Self { version }
    }

    pub const fn version(self) -> HostVersion {
        self.version
    }

    /// Pre-Oreo hosts resolve static callees through the caller's dex cache,
    /// so static invokes carry the current method as a trailing input.
    pub const fn static_invoke_needs_current_method(self) -> bool {
        !matches!(self.version, HostVersion::Oreo)
    }

    /// Invoke node kind for a codelib call.
    pub const fn invoke_kind(self, call: CallKind) -> InvokeKind {
        match call {
            CallKind::Static => InvokeKind::StaticOrDirect,
            CallKind::Virtual => InvokeKind::Virtual,
            CallKind::Interface => InvokeKind::Interface,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_method_input_by_release() {
        assert!(HostAdapter::new(HostVersion::Marshmallow).static_invoke_needs_current_method());
        assert!(HostAdapter::new(HostVersion::Nougat).static_invoke_needs_current_method());
        assert!(!HostAdapter::new(HostVersion::Oreo).static_invoke_needs_current_method());
    }

    #[test]
    fn test_invoke_kind() {
        let adapter = HostAdapter::new(HostVersion::Oreo);
        assert_eq!(adapter.invoke_kind(CallKind::Static), InvokeKind::StaticOrDirect);
        assert_eq!(adapter.invoke_kind(CallKind::Interface), InvokeKind::Interface);
    }
}
