//! Process-wide method denylist.

use regex::RegexSet;

use crate::Result;

/// Method name patterns that must never be instrumented.
#[derive(Clone, Debug)]
pub struct Blacklist {
    patterns: RegexSet,
}

impl Blacklist {
    /// Compile a blacklist from regular expressions matched against the
    /// method name (without signature).
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn empty() -> Self {
        Self {
            patterns: RegexSet::empty(),
        }
    }

    pub fn is_blacklisted(&self, method_name: &str) -> bool {
        self.patterns.is_match(method_name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        let list = Blacklist::new([r"^android\.support\.", r"\.toString$"]).unwrap();
        assert!(list.is_blacklisted("android.support.v4.Foo.bar"));
        assert!(list.is_blacklisted("com.app.Main.toString"));
        assert!(!list.is_blacklisted("com.app.Main.onCreate"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_empty_matches_nothing() {
        let list = Blacklist::empty();
        assert!(list.is_empty());
        assert!(!list.is_blacklisted("anything"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Blacklist::new(["("]).is_err());
    }
}
