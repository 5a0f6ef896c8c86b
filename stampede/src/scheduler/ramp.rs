use stampede_core::Stage;
use std::time::Duration;

/// Piecewise-linear target population over the stages of a plan.
///
/// Each stage ramps from the previous stage's target (0 for the first stage) to its own. A stage
/// with zero duration jumps straight to its target. Past the last stage the last target holds.
#[derive(Clone, Debug)]
pub(crate) struct Ramp {
    stages: Vec<Stage>,
    total: Duration,
}

impl Ramp {
    pub fn new(stages: &[Stage]) -> Self {
        Self {
            stages: stages.to_vec(),
            total: stages.iter().map(|s| s.duration).sum(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// Index of the stage running at `elapsed`, or `None` once every stage has elapsed.
    pub fn stage_at(&self, elapsed: Duration) -> Option<usize> {
        let mut end = Duration::ZERO;
        for (idx, stage) in self.stages.iter().enumerate() {
            end += stage.duration;
            if elapsed < end {
                return Some(idx);
            }
        }
        None
    }

    pub fn target_at(&self, elapsed: Duration) -> f64 {
        let mut start = Duration::ZERO;
        let mut prev = 0.;

        for stage in &self.stages {
            let end = start + stage.duration;
            if elapsed < end {
                let f = (elapsed - start).as_secs_f64() / stage.duration.as_secs_f64();
                return prev + (stage.target as f64 - prev) * f;
            }
            prev = stage.target as f64;
            start = end;
        }

        prev
    }

    /// `target_at` rounded half away from zero.
    pub fn population_at(&self, elapsed: Duration) -> usize {
        self.target_at(elapsed).round().max(0.) as usize
    }
}
