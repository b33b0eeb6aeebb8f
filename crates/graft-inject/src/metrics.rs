//! Instrumentation metrics using metrics-rs.
//!
//! Without an installed recorder every call here is a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter,
};
use parking_lot::RwLock;

use crate::SkipReason;

pub const METHODS_INSTRUMENTED: &str = "graft_methods_instrumented_total";
pub const METHODS_SKIPPED: &str = "graft_methods_skipped_total";
pub const CALLS_INJECTED: &str = "graft_calls_injected_total";

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        METHODS_INSTRUMENTED,
        Unit::Count,
        "Methods that went through every instrumentation module"
    );
    describe_counter!(
        METHODS_SKIPPED,
        Unit::Count,
        "Methods left untouched because they are blacklisted or part of the codelib"
    );
    describe_counter!(CALLS_INJECTED, Unit::Count, "Codelib calls spliced into method graphs");
}

/// Record a finished method and the calls injected into it.
pub fn record_instrumented(calls: usize) {
    counter!(METHODS_INSTRUMENTED).increment(1);
    counter!(CALLS_INJECTED).increment(calls as u64);
}

/// Record a skipped method.
pub fn record_skipped(reason: SkipReason) {
    counter!(METHODS_SKIPPED, "reason" => reason.as_str()).increment(1);
}

/// In-memory counter recorder, for tests and summaries.
///
/// Gauges and histograms are not used by the core and are dropped.
#[derive(Clone, Default)]
pub struct CountingRecorder {
    counters: Arc<RwLock<HashMap<String, u64>>>,
}

struct CountingCounter {
    key: String,
    counters: Arc<RwLock<HashMap<String, u64>>>,
}

impl metrics::CounterFn for CountingCounter {
    fn increment(&self, value: u64) {
        *self.counters.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.counters.write().insert(self.key.clone(), value);
    }
}

impl CountingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value by rendered key, e.g. `graft_methods_skipped_total{reason=blacklisted}`.
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.counters.read().get(key).copied()
    }

    pub fn all_counters(&self) -> HashMap<String, u64> {
        self.counters.read().clone()
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CountingCounter {
            key: key_to_string(key),
            counters: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
