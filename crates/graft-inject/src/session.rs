//! Process-wide instrumentation state.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use tracing::info;

use crate::{Blacklist, DexfileEnvironment, GraftConfig, HostAdapter, Result};

/// Version announced once per session.
pub const VERSION: &str = "00110";

/// State shared by every compiling thread for the lifetime of a compilation
/// session.
///
/// Holds the compiled blacklist, the selected host adapter and the counters.
/// Counters are only touched through atomic operations.
pub struct Session {
    config: GraftConfig,
    adapter: HostAdapter,
    blacklist: Blacklist,
    dexfiles: DexfileEnvironment,
    method_counter: AtomicU32,
    skipped: AtomicU32,
    calls: AtomicU64,
    version_logged: AtomicBool,
}

impl Session {
    pub fn new(config: GraftConfig) -> Result<Self> {
        let blacklist = Blacklist::new(&config.blacklist)?;
        let dexfiles = DexfileEnvironment::new(config.codelib_locations.iter().cloned());
        crate::metrics::init();
        info!(
            host = %config.host_version,
            blacklist = blacklist.len(),
            codelib_locations = dexfiles.num_codelib_locations(),
            "starting instrumentation session"
        );
        Ok(Self {
            adapter: HostAdapter::new(config.host_version),
            config,
            blacklist,
            dexfiles,
            method_counter: AtomicU32::new(0),
            skipped: AtomicU32::new(0),
            calls: AtomicU64::new(0),
            version_logged: AtomicBool::new(false),
        })
    }

    pub const fn config(&self) -> &GraftConfig {
        &self.config
    }

    pub const fn adapter(&self) -> HostAdapter {
        self.adapter
    }

    /// Announce the framework version. Only the first call in a session logs;
    /// returns whether this call did.
    pub fn log_version_once(&self) -> bool {
        if self.version_logged.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!(version = VERSION, "graft injection core");
        true
    }

    pub fn is_blacklisted(&self, method_name: &str) -> bool {
        self.blacklist.is_blacklisted(method_name)
    }

    pub fn is_codelib(&self, dex_location: &str) -> bool {
        self.dexfiles.is_codelib(dex_location)
    }

    /// Count a finished method, returning its 1-based number.
    pub fn next_method_number(&self) -> u32 {
        self.method_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Methods that finished instrumentation so far.
    pub fn methods_processed(&self) -> u32 {
        self.method_counter.load(Ordering::Relaxed)
    }

    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_calls(&self, calls: usize) {
        self.calls.fetch_add(calls as u64, Ordering::Relaxed);
    }

    /// Tear the session down and report its totals.
    pub fn finish(self) -> SessionStats {
        let stats = SessionStats {
            methods_instrumented: self.method_counter.into_inner(),
            methods_skipped: self.skipped.into_inner(),
            calls_injected: self.calls.into_inner(),
        };
        info!(%stats, "instrumentation session finished");
        stats
    }
}

/// Totals of a finished session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub methods_instrumented: u32,
    pub methods_skipped: u32,
    pub calls_injected: u64,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} methods instrumented, {} skipped, {} calls injected",
            self.methods_instrumented, self.methods_skipped, self.calls_injected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_latch() {
        let session = Session::new(GraftConfig::default()).unwrap();
        assert!(session.log_version_once());
        assert!(!session.log_version_once());
        assert!(!session.log_version_once());
    }

    #[test]
    fn test_method_numbers_start_at_one() {
        let session = Session::new(GraftConfig::default()).unwrap();
        assert_eq!(session.methods_processed(), 0);
        assert_eq!(session.next_method_number(), 1);
        assert_eq!(session.next_method_number(), 2);
        assert_eq!(session.methods_processed(), 2);
    }

    #[test]
    fn test_invalid_blacklist() {
        let config = GraftConfig::default().with_blacklisted("[unclosed");
        assert!(matches!(Session::new(config), Err(crate::Error::Blacklist(_))));
    }

    #[test]
    fn test_filters() {
        let config = GraftConfig::default()
            .with_blacklisted(r"^java\.")
            .with_codelib_location("codelib.apk");
        let session = Session::new(config).unwrap();
        assert!(session.is_blacklisted("java.lang.Object.toString"));
        assert!(!session.is_blacklisted("com.app.Main.run"));
        assert!(session.is_codelib("/data/app/codelib.apk"));
    }

    #[test]
    fn test_finish_reports_totals() {
        let session = Session::new(GraftConfig::default()).unwrap();
        session.next_method_number();
        session.record_calls(4);
        session.record_skip();
        let stats = session.finish();
        assert_eq!(
            stats,
            SessionStats {
                methods_instrumented: 1,
                methods_skipped: 1,
                calls_injected: 4,
            }
        );
        assert_eq!(stats.to_string(), "1 methods instrumented, 1 skipped, 4 calls injected");
    }

    #[test]
    fn test_concurrent_counter() {
        let session = Session::new(GraftConfig::default()).unwrap();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        session.next_method_number();
                    }
                });
            }
        });
        assert_eq!(session.methods_processed(), 800);
    }
}
