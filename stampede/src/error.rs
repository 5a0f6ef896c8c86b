use stampede_core::ConfigError;
use thiserror::Error;

/// Failures of the scheduler itself. Fatal to the run; all workers are torn down immediately.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Virtual user {id} panicked")]
    WorkerPanicked { id: u64 },
}

/// Why a run is reported as failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid run plan: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler failure: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("No virtual user could connect ({failures} failed attempts)")]
    Unreachable { failures: u64 },
}
