use crate::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A trend statistic, written the same way in summaries and thresholds (`min`, `avg`, `p(95)`, ...).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Stat {
    Min,
    Max,
    Avg,
    Med,
    Count,
    /// Pass rate; only meaningful for the `checks` metric.
    Rate,
    /// Percentile in `[0, 100]`.
    Percentile(f64),
}

impl FromStr for Stat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stat = match s.trim() {
            "min" => Stat::Min,
            "max" => Stat::Max,
            "avg" => Stat::Avg,
            "med" => Stat::Med,
            "count" => Stat::Count,
            "rate" => Stat::Rate,
            other => {
                let p = other
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|p| p.trim().parse::<f64>().ok())
                    .filter(|p| (0. ..=100.).contains(p))
                    .ok_or_else(|| ConfigError::InvalidStat(other.to_string()))?;
                Stat::Percentile(p)
            }
        };
        Ok(stat)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Min => write!(f, "min"),
            Stat::Max => write!(f, "max"),
            Stat::Avg => write!(f, "avg"),
            Stat::Med => write!(f, "med"),
            Stat::Count => write!(f, "count"),
            Stat::Rate => write!(f, "rate"),
            Stat::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

/// Pass/fail totals for one named check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckCounts {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckCounts {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.;
        }
        self.passes as f64 / self.total() as f64
    }
}

/// Requested statistics for one trend metric, computed over every sample recorded so far.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendSummary {
    pub metric: String,
    pub count: usize,
    pub values: Vec<(Stat, f64)>,
}

impl TrendSummary {
    pub fn get(&self, stat: Stat) -> Option<f64> {
        self.values
            .iter()
            .find(|(s, _)| *s == stat)
            .map(|(_, value)| *value)
    }
}

impl fmt::Display for TrendSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.metric)?;
        for (stat, value) in &self.values {
            match stat {
                Stat::Count => write!(f, " {stat}={value}")?,
                _ => write!(f, " {stat}={value:.2}ms")?,
            }
        }
        Ok(())
    }
}
