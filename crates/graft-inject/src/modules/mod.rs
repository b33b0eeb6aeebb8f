//! Built-in instrumentation modules.

mod trace;

pub use trace::*;
