use crate::registry::Registry;
use metrics_util::AtomicBucket;
use stampede_core::{Stat, TrendSummary};
use std::time::Duration;

/// Thread-safe sample store for trend metrics (latencies, iteration times, ...).
///
/// Samples are appended to a lock-free bucket per metric; statistics are computed on demand over
/// every sample recorded so far, so the result does not depend on the order samples arrived in.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    trends: Registry<Samples>,
}

#[derive(Debug)]
struct Samples(AtomicBucket<f64>);

impl Default for Samples {
    fn default() -> Self {
        Self(AtomicBucket::new())
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, metric: &str, value: f64) {
        self.trends.with(metric, |samples| samples.0.push(value));

        #[cfg(feature = "metrics")]
        metrics::histogram!(metric.to_string()).record(value);
    }

    /// Records a duration in milliseconds.
    pub fn record_duration(&self, metric: &str, duration: Duration) {
        self.record(metric, duration.as_nanos() as f64 / 1_000_000.);
    }

    /// `None` if nothing was recorded for `metric`.
    pub fn summary(&self, metric: &str, stats: &[Stat]) -> Option<TrendSummary> {
        let samples = self.trends.get(metric, |samples| samples.0.data())?;
        summarize(metric, samples, stats)
    }

    /// Summaries of every metric, in the order they were first recorded.
    pub fn summaries(&self, stats: &[Stat]) -> Vec<TrendSummary> {
        self.trends
            .map(|metric, samples| summarize(metric, samples.0.data(), stats))
            .into_iter()
            .flatten()
            .collect()
    }
}

fn summarize(metric: &str, mut samples: Vec<f64>, stats: &[Stat]) -> Option<TrendSummary> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(f64::total_cmp);

    let values = stats
        .iter()
        .filter_map(|stat| compute(*stat, &samples).map(|value| (*stat, value)))
        .collect();

    Some(TrendSummary {
        metric: metric.to_string(),
        count: samples.len(),
        values,
    })
}

/// `sorted` must be non-empty and ascending.
fn compute(stat: Stat, sorted: &[f64]) -> Option<f64> {
    let value = match stat {
        Stat::Min => sorted[0],
        Stat::Max => sorted[sorted.len() - 1],
        Stat::Avg => statistical::mean(sorted),
        Stat::Med => percentile(sorted, 50.),
        Stat::Count => sorted.len() as f64,
        Stat::Percentile(p) => percentile(sorted, p),
        Stat::Rate => return None,
    };
    Some(value)
}

/// Linear interpolation between the two closest ranks, at position `p/100 * (n - 1)`.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = (p.clamp(0., 100.) / 100.) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}
