#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod checks;
mod client;
mod error;
mod progress;
mod registry;
mod report;
mod scheduler;
mod trends;
mod worker;

#[cfg(test)]
mod testing;

pub use checks::{CheckAggregator, CheckSnapshot};
pub use client::{ConnectError, InvokeError, Payload, RpcClient, TeardownError};
pub use error::{RunError, SchedulerError};
pub use load_test::LoadTest;
pub use progress::{Progress, ProgressHandle, StopHandle};
pub use report::{Counters, RunReport, ThresholdResult};
pub use trends::MetricsRecorder;
pub use worker::{default_payload, IterationInfo, PayloadFn};

/// Plan, endpoint and result types shared with client implementations.
pub use stampede_core as core;

pub mod prelude {
    pub use crate::{LoadTest, RpcClient, RunReport};
    pub use crate::{ConnectError, InvokeError, Payload, TeardownError};
    pub use stampede_core::{
        Assertion, Check, ConfigError, ConnectOptions, Endpoint, InvocationResult, RunPlan, Stage,
        Stat, Status, Target, TargetSettings, Threshold,
    };
}
