use thiserror::Error;

/// Problems with a [`RunPlan`](crate::RunPlan) or its inputs, detected before any worker starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Run plan has no stages")]
    NoStages,

    #[error("Run plan stages add up to zero duration")]
    ZeroDuration,

    #[error("Run plan has no targets")]
    NoTargets,

    #[error("Target name `{0}` is used more than once")]
    DuplicateTarget(String),

    #[error("Invalid target `{0}`")]
    EmptyEndpoint(String),

    #[error("Invalid target endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Environment variable `{0}` is not set")]
    MissingEnv(&'static str),

    #[error("Unknown statistic `{0}`")]
    InvalidStat(String),

    #[error("Invalid threshold expression `{0}`")]
    InvalidThreshold(String),
}
