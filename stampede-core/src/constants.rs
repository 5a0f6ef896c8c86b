use crate::Stat;
use std::time::Duration;

/// How often the scheduler re-evaluates the population target.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// How long workers are given to finish their current iteration once the plan
/// has elapsed or the run was stopped.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// The statistics computed for every trend metric unless the plan overrides them.
pub const DEFAULT_SUMMARY_TREND_STATS: [Stat; 6] = [
    Stat::Min,
    Stat::Max,
    Stat::Avg,
    Stat::Percentile(90.),
    Stat::Percentile(95.),
    Stat::Percentile(99.),
];

/// Latency of each RPC invocation, in milliseconds.
pub const RPC_REQ_DURATION: &str = "rpc_req_duration";

/// Wall-clock time of a full iteration (all targets), in milliseconds.
pub const ITERATION_DURATION: &str = "iteration_duration";

/// Pseudo-metric name used by thresholds on the check pass rate.
pub const CHECKS_METRIC: &str = "checks";

pub const DEFAULT_RESOLVER_SCHEME: &str = "k8s";
pub const DEFAULT_RPC_PORT: u16 = 50051;
pub const DEFAULT_RPC_METHOD: &str = "helloworld.Greeter/SayHello";

/// Connect timeout of targets built from the environment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const SERVER_ENV: &str = "GRPC_SERVER";
pub const SECOND_SERVER_ENV: &str = "GRPC_SERVER_2";
pub const SCHEME_ENV: &str = "GRPC_RESOLVER_PROTOCOL";
pub const PORT_ENV: &str = "GRPC_PORT";

/// Exit code reported when every run completed but a threshold was crossed.
pub const THRESHOLDS_FAILED_EXIT_CODE: i32 = 99;

/// Exit code reported when the run itself failed (config, scheduler, unreachable target).
pub const RUN_FAILED_EXIT_CODE: i32 = 1;
