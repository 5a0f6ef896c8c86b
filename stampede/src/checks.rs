use crate::registry::Registry;
use stampede_core::CheckCounts;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe pass/fail counters, keyed by check name.
///
/// Distinct names accumulate independently and are reported in the order they were first seen.
#[derive(Debug, Default)]
pub struct CheckAggregator {
    checks: Registry<Counter>,
}

#[derive(Debug, Default)]
struct Counter {
    passes: AtomicU64,
    fails: AtomicU64,
}

impl CheckAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, passed: bool) {
        self.checks.with(name, |counter| {
            if passed {
                counter.passes.fetch_add(1, Ordering::Relaxed);
            } else {
                counter.fails.fetch_add(1, Ordering::Relaxed);
            }
        });

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "checks",
            "check" => name.to_string(),
            "result" => if passed { "pass" } else { "fail" }
        )
        .increment(1);
    }

    pub fn snapshot(&self) -> CheckSnapshot {
        let entries = self.checks.map(|name, counter| CheckCounts {
            name: name.to_string(),
            passes: counter.passes.load(Ordering::Relaxed),
            fails: counter.fails.load(Ordering::Relaxed),
        });
        CheckSnapshot { entries }
    }
}

/// Point-in-time copy of every check, in first-recorded order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckSnapshot {
    entries: Vec<CheckCounts>,
}

impl CheckSnapshot {
    pub fn get(&self, name: &str) -> Option<&CheckCounts> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckCounts> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passes(&self) -> u64 {
        self.entries.iter().map(|c| c.passes).sum()
    }

    pub fn fails(&self) -> u64 {
        self.entries.iter().map(|c| c.fails).sum()
    }

    pub fn total(&self) -> u64 {
        self.passes() + self.fails()
    }

    /// Fraction of passed checks across every name. `None` when nothing was recorded.
    pub fn rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.passes() as f64 / total as f64),
        }
    }
}
