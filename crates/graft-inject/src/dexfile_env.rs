//! Dex file identification.

use rustc_hash::FxHashSet;

/// Knows which dex files hold the codelib, so they are never instrumented.
#[derive(Clone, Debug, Default)]
pub struct DexfileEnvironment {
    codelib_locations: FxHashSet<String>,
}

impl DexfileEnvironment {
    pub fn new<I, S>(codelib_locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codelib_locations: codelib_locations.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether `location` is a codelib file.
    ///
    /// A configured entry matches the full location or its trailing path
    /// components, so `codelib.apk` matches `/data/app/codelib.apk`.
    pub fn is_codelib(&self, location: &str) -> bool {
        self.codelib_locations.iter().any(|codelib| {
            location
                .strip_suffix(codelib.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
        })
    }

    pub fn num_codelib_locations(&self) -> usize {
        self.codelib_locations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_codelib() {
        let env = DexfileEnvironment::new(["codelib.apk", "/system/framework/artist.jar"]);
        assert!(env.is_codelib("codelib.apk"));
        assert!(env.is_codelib("/data/app/codelib.apk"));
        assert!(env.is_codelib("/system/framework/artist.jar"));
        assert!(!env.is_codelib("/data/app/mycodelib.apk"));
        assert!(!env.is_codelib("/data/app/base.apk"));
    }

    #[test]
    fn test_empty() {
        let env = DexfileEnvironment::default();
        assert_eq!(env.num_codelib_locations(), 0);
        assert!(!env.is_codelib("codelib.apk"));
    }
}
