//! Instrumentation configuration.

use std::fmt;

/// Host runtime release the graphs come from.
///
/// Selected once per session; see [`HostAdapter`](crate::HostAdapter) for the
/// behaviour that differs between releases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostVersion {
    Marshmallow,
    Nougat,
    #[default]
    Oreo,
}

impl HostVersion {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marshmallow => "marshmallow",
            Self::Nougat => "nougat",
            Self::Oreo => "oreo",
        }
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct GraftConfig {
    /// Host runtime release.
    pub host_version: HostVersion,
    /// Method name patterns (regular expressions) that are never instrumented.
    pub blacklist: Vec<String>,
    /// Dex file locations that hold the codelib itself.
    pub codelib_locations: Vec<String>,
    /// Run the graph checker after each instrumented method.
    pub verify_graphs: bool,
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            host_version: HostVersion::default(),
            blacklist: Vec::new(),
            codelib_locations: Vec::new(),
            verify_graphs: cfg!(debug_assertions),
        }
    }
}

impl GraftConfig {
    /// Set the host runtime release.
    #[must_use]
    pub const fn with_host_version(mut self, version: HostVersion) -> Self {
        self.host_version = version;
        self
    }

    /// Add a blacklist pattern.
    #[must_use]
    pub fn with_blacklisted(mut self, pattern: &str) -> Self {
        self.blacklist.push(pattern.to_string());
        self
    }

    /// Mark a dex file location as the codelib.
    #[must_use]
    pub fn with_codelib_location(mut self, location: &str) -> Self {
        self.codelib_locations.push(location.to_string());
        self
    }

    /// Enable or disable post-instrumentation graph verification.
    #[must_use]
    pub const fn with_verify_graphs(mut self, enabled: bool) -> Self {
        self.verify_graphs = enabled;
        self
    }
}
