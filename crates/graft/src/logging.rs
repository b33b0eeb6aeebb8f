//! Log setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Environment variable holding the log filter. `RUST_LOG` is the fallback.
pub const LOG_ENV: &str = "GRAFT_LOG";

pub const DEFAULT_DIRECTIVE: &str = "graft=info";

/// Install the global fmt subscriber.
///
/// The filter comes from `GRAFT_LOG`, then `RUST_LOG`, then
/// `default_directive`. Returns whether this call installed the subscriber;
/// later calls leave the first one in place.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init()
        .is_ok()
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        // Whoever called first, a subscriber is installed from here on.
        init(DEFAULT_DIRECTIVE);
        assert!(!init(DEFAULT_DIRECTIVE));
        assert!(!init("graft=debug"));
    }
}
