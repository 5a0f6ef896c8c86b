use crate::checks::CheckSnapshot;
use crate::error::RunError;
use crate::{CheckAggregator, MetricsRecorder};
use stampede_core::{
    RunPlan, Stat, Threshold, TrendSummary, CHECKS_METRIC, RUN_FAILED_EXIT_CODE,
    THRESHOLDS_FAILED_EXIT_CODE,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Run-wide counters shared by every worker.
#[derive(Debug, Default)]
pub(crate) struct RunCounters {
    iterations: AtomicU64,
    invocations: AtomicU64,
    invoke_errors: AtomicU64,
    connects_ok: AtomicU64,
    connects_failed: AtomicU64,
    connects_abandoned: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    close_errors: AtomicU64,
}

impl RunCounters {
    pub fn iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invocation(&self, failed: bool) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.invoke_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn connect(&self, ok: bool) {
        if ok {
            self.connects_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.connects_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A connect phase that never completed before its worker was retired or aborted.
    pub fn connect_abandoned(&self) {
        self.connects_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self, ok: bool) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.close_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Counters {
        Counters {
            iterations: self.iterations.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            invoke_errors: self.invoke_errors.load(Ordering::Relaxed),
            connects_ok: self.connects_ok.load(Ordering::Relaxed),
            connects_failed: self.connects_failed.load(Ordering::Relaxed),
            connects_abandoned: self.connects_abandoned.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            close_errors: self.close_errors.load(Ordering::Relaxed),
        }
    }
}

/// Final values of the run counters.
///
/// `connects_ok`/`connects_failed`/`connects_abandoned` count virtual users (one connect phase
/// each), while `connections_opened`/`connections_closed` count individual connections.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub iterations: u64,
    pub invocations: u64,
    pub invoke_errors: u64,
    pub connects_ok: u64,
    pub connects_failed: u64,
    pub connects_abandoned: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub close_errors: u64,
}

impl Counters {
    /// Connect phases that started but never succeeded.
    pub fn connects_unsuccessful(&self) -> u64 {
        self.connects_failed + self.connects_abandoned
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdResult {
    pub metric: String,
    pub threshold: Threshold,
    /// `None` when the metric had no data, which always fails the threshold.
    pub observed: Option<f64>,
    pub passed: bool,
}

/// Everything known once a run is over and torn down.
#[derive(Debug)]
pub struct RunReport {
    pub checks: CheckSnapshot,
    pub trends: Vec<TrendSummary>,
    pub counters: Counters,
    pub thresholds: Vec<ThresholdResult>,
    pub elapsed: Duration,
    /// Highest number of live virtual users at any tick.
    pub vus_max: usize,
    /// Virtual users that were still running at the end of the run.
    pub live_at_end: usize,
    /// Virtual users that had to be force-terminated because they did not stop in time.
    pub abnormal_teardowns: usize,
    pub error: Option<RunError>,
}

impl RunReport {
    pub(crate) fn failed(error: RunError, elapsed: Duration) -> Self {
        Self {
            checks: CheckSnapshot::default(),
            trends: vec![],
            counters: Counters::default(),
            thresholds: vec![],
            elapsed,
            vus_max: 0,
            live_at_end: 0,
            abnormal_teardowns: 0,
            error: Some(error),
        }
    }

    pub fn trend(&self, metric: &str) -> Option<&TrendSummary> {
        self.trends.iter().find(|t| t.metric == metric)
    }

    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn passed(&self) -> bool {
        self.error.is_none() && self.thresholds_passed()
    }

    pub fn exit_code(&self) -> i32 {
        if self.error.is_some() {
            RUN_FAILED_EXIT_CODE
        } else if !self.thresholds_passed() {
            THRESHOLDS_FAILED_EXIT_CODE
        } else {
            0
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in self.checks.iter() {
            writeln!(
                f,
                "check {:?}: {} passed, {} failed",
                check.name, check.passes, check.fails
            )?;
        }
        for trend in &self.trends {
            writeln!(f, "{trend}")?;
        }
        for t in &self.thresholds {
            writeln!(
                f,
                "threshold {} {}: {}",
                t.metric,
                t.threshold,
                if t.passed { "ok" } else { "crossed" }
            )?;
        }
        write!(
            f,
            "iterations={} invocations={} vus_max={} elapsed={}",
            self.counters.iterations,
            self.counters.invocations,
            self.vus_max,
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64)),
        )?;
        if let Some(error) = &self.error {
            write!(f, "\nerror: {error}")?;
        }
        Ok(())
    }
}

pub(crate) fn evaluate_thresholds(
    plan: &RunPlan,
    checks: &CheckAggregator,
    trends: &MetricsRecorder,
) -> Vec<ThresholdResult> {
    let snapshot = &checks.snapshot();
    plan.thresholds
        .iter()
        .flat_map(|(metric, thresholds)| {
            thresholds.iter().map(move |threshold| {
                let observed = if metric == CHECKS_METRIC {
                    match threshold.stat {
                        Stat::Rate => snapshot.rate(),
                        Stat::Count => Some(snapshot.total() as f64),
                        _ => None,
                    }
                } else {
                    trends
                        .summary(metric, &[threshold.stat])
                        .and_then(|s| s.get(threshold.stat))
                };

                ThresholdResult {
                    metric: metric.clone(),
                    threshold: threshold.clone(),
                    observed,
                    passed: observed.map_or(false, |v| threshold.holds(v)),
                }
            })
        })
        .collect()
}
