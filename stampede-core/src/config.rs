use crate::{
    Check, ConfigError, ConnectOptions, Endpoint, Stat, Threshold, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_GRACEFUL_STOP, DEFAULT_RESOLVER_SCHEME, DEFAULT_RPC_METHOD, DEFAULT_RPC_PORT,
    DEFAULT_SUMMARY_TREND_STATS, DEFAULT_TICK, PORT_ENV, SCHEME_ENV, SECOND_SERVER_ENV,
    SERVER_ENV,
};
use serde::{Deserialize, Deserializer};
use serde_with::{serde_as, DisplayFromStr};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// One window of the ramp: over `duration`, the population moves linearly from the previous
/// stage's target (0 for the first stage) to `target`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Stage {
    #[serde(deserialize_with = "human_duration")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// One RPC endpoint every virtual user connects to and calls on each iteration.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde_as(as = "DisplayFromStr")]
    pub endpoint: Endpoint,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub checks: Vec<Check>,
    #[serde(default)]
    pub options: ConnectOptions,
}

impl Target {
    pub fn new(name: &str, endpoint: Endpoint, method: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint,
            method: method.to_string(),
            group: None,
            checks: vec![],
            options: ConnectOptions::default(),
        }
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }
}

/// Everything a run needs besides the client and the payload builder.
///
/// Built once, then read-only for the whole run. Can be assembled with the builder methods or
/// deserialized, e.g.
///
/// ```json
/// {
///   "stages": [
///     { "duration": "1s", "target": 1 },
///     { "duration": "120s", "target": 50 },
///     { "duration": "10s", "target": 0 }
///   ],
///   "sleep": "300ms",
///   "summary_trend_stats": ["min", "max", "avg", "p(90)", "p(95)", "p(99)"],
///   "thresholds": { "rpc_req_duration": ["p(95)<500"], "checks": ["rate>0.99"] }
/// }
/// ```
#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RunPlan {
    pub stages: Vec<Stage>,

    #[serde(default)]
    pub targets: Vec<Target>,

    /// Pause between two iterations of the same virtual user.
    #[serde(default, deserialize_with = "human_duration")]
    pub sleep: Duration,

    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[serde(default = "default_summary_trend_stats")]
    pub summary_trend_stats: Vec<Stat>,

    #[serde_as(as = "BTreeMap<_, Vec<DisplayFromStr>>")]
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<Threshold>>,

    #[serde(default = "default_tick", deserialize_with = "human_duration")]
    pub tick: Duration,

    #[serde(
        default = "default_graceful_stop",
        deserialize_with = "human_duration"
    )]
    pub graceful_stop: Duration,
}

impl RunPlan {
    pub fn new(stages: &[Stage]) -> Self {
        Self {
            stages: stages.to_vec(),
            targets: vec![],
            sleep: Duration::ZERO,
            summary_trend_stats: default_summary_trend_stats(),
            thresholds: BTreeMap::new(),
            tick: DEFAULT_TICK,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets.extend(targets);
        self
    }

    pub fn sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn summary_trend_stats(mut self, stats: &[Stat]) -> Self {
        self.summary_trend_stats = stats.to_vec();
        self
    }

    pub fn threshold(mut self, metric: &str, threshold: Threshold) -> Self {
        self.thresholds
            .entry(metric.to_string())
            .or_default()
            .push(threshold);
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    /// Sum of all stage durations.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        if self.total_duration().is_zero() {
            return Err(ConfigError::ZeroDuration);
        }

        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if !names.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
        }

        Ok(())
    }
}

/// Targets configured through the environment: `GRPC_SERVER` is required, `GRPC_SERVER_2` adds an
/// optional second target.
#[derive(Clone, Debug)]
pub struct TargetSettings {
    pub scheme: String,
    pub port: u16,
    pub servers: Vec<String>,
}

impl TargetSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let first = non_empty(SERVER_ENV).ok_or(ConfigError::MissingEnv(SERVER_ENV))?;
        let mut servers = vec![first];
        if let Some(second) = non_empty(SECOND_SERVER_ENV) {
            servers.push(second);
        }

        let scheme = non_empty(SCHEME_ENV).unwrap_or_else(|| DEFAULT_RESOLVER_SCHEME.to_string());
        let port = match non_empty(PORT_ENV) {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port))?,
            None => DEFAULT_RPC_PORT,
        };

        Ok(Self {
            scheme,
            port,
            servers,
        })
    }

    /// One plaintext target per configured server, calling the greeter method with a single
    /// `status is OK` style check. The first target is `client`, later ones `client2`, ...
    ///
    /// A server is either a bare host or a full `scheme:///host:port` target; a missing scheme or
    /// port is taken from the settings.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        self.servers
            .iter()
            .enumerate()
            .map(|(idx, server)| {
                let mut endpoint = Endpoint::parse(server)?;
                if endpoint.scheme().is_none() {
                    endpoint = endpoint.with_scheme(&self.scheme);
                }
                if endpoint.port().is_none() {
                    endpoint = endpoint.with_port(self.port);
                }
                let suffix = if idx == 0 {
                    String::new()
                } else {
                    (idx + 1).to_string()
                };

                Ok(
                    Target::new(&format!("client{suffix}"), endpoint, DEFAULT_RPC_METHOD)
                        .group(&format!("demoGrpcGroup{suffix}"))
                        .check(Check::status_ok(&format!("status{suffix} is OK")))
                        .options(ConnectOptions {
                            plaintext: true,
                            timeout: Some(DEFAULT_CONNECT_TIMEOUT),
                        }),
                )
            })
            .collect()
    }
}

fn default_method() -> String {
    DEFAULT_RPC_METHOD.to_string()
}

fn default_summary_trend_stats() -> Vec<Stat> {
    DEFAULT_SUMMARY_TREND_STATS.to_vec()
}

fn default_tick() -> Duration {
    DEFAULT_TICK
}

fn default_graceful_stop() -> Duration {
    DEFAULT_GRACEFUL_STOP
}

pub(crate) fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn human_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => humantime::parse_duration(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
