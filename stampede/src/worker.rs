//! Virtual user lifecycle.
//!
//! `Created → Connecting → Iterating → Stopping → Closed`
//!
//! A virtual user connects to every target on its first iteration only, then iterates until the
//! scheduler signals it to stop. Stop signals are only honoured between iterations; an in-flight
//! call is never cancelled.
use crate::client::{ConnectError, Payload, RpcClient};
use crate::progress::stop_requested;
use crate::report::RunCounters;
use crate::{CheckAggregator, MetricsRecorder};
use serde_json::json;
use stampede_core::{RunPlan, Target, ITERATION_DURATION, RPC_REQ_DURATION};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Identifies the call a payload is built for.
#[derive(Debug)]
pub struct IterationInfo<'a> {
    /// Virtual user id, starting at 1.
    pub vu: u64,
    /// Iteration of this virtual user, starting at 0.
    pub iteration: u64,
    /// Position of `target` in the plan, starting at 1.
    pub client: usize,
    pub target: &'a Target,
}

pub type PayloadFn = Arc<dyn Fn(&IterationInfo<'_>) -> Payload + Send + Sync>;

/// `{ "name": "stampede client=1 VU=3 Iter=12" }`, so every request can be traced back to the
/// virtual user and iteration that sent it.
pub fn default_payload(info: &IterationInfo<'_>) -> Payload {
    json!({
        "name": format!(
            "stampede client={} VU={} Iter={}",
            info.client, info.vu, info.iteration
        )
    })
}

/// State shared by every virtual user of a run.
pub(crate) struct RunContext<C> {
    pub client: C,
    pub plan: RunPlan,
    pub payload: PayloadFn,
    pub checks: CheckAggregator,
    pub trends: MetricsRecorder,
    pub counters: RunCounters,
}

impl<C> RunContext<C> {
    pub fn new(client: C, plan: RunPlan, payload: PayloadFn) -> Self {
        Self {
            client,
            plan,
            payload,
            checks: CheckAggregator::new(),
            trends: MetricsRecorder::new(),
            counters: RunCounters::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum VuState {
    Created,
    Connecting,
    Iterating,
    Stopping,
    Closed,
}

/// How a virtual user's task ended.
#[derive(Debug)]
pub(crate) enum VuExit {
    Stopped { iterations: u64 },
    /// Retired by the scheduler before every connection was open.
    RetiredWhileConnecting,
    ConnectFailed(ConnectError),
}

struct OpenConnection<T> {
    /// Index into the plan's targets.
    target: usize,
    conn: T,
}

pub(crate) struct VirtualUser<C: RpcClient> {
    id: u64,
    iteration: u64,
    connected: bool,
    state: VuState,
    connections: Vec<OpenConnection<C::Connection>>,
}

impl<C: RpcClient> VirtualUser<C> {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            iteration: 0,
            connected: false,
            state: VuState::Created,
            connections: vec![],
        }
    }

    #[allow(unused)]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> VuState {
        self.state
    }

    #[allow(unused)]
    pub fn connected(&self) -> bool {
        self.connected
    }

    #[allow(unused)]
    pub fn open_connections(&self) -> usize {
        self.connections.len()
    }

    #[instrument(name = "vu", skip_all, fields(id = self.id))]
    pub async fn run(
        &mut self,
        ctx: &RunContext<C>,
        mut stop: watch::Receiver<bool>,
    ) -> VuExit {
        loop {
            if !self.connected {
                self.state = VuState::Connecting;

                // NOTE: Retiring a worker mid-connect is the only case where we drop an in-flight
                // call; no request has been sent on these connections yet.
                let res = tokio::select! {
                    res = self.connect(ctx) => Some(res),
                    _ = stop_requested(&mut stop) => None,
                };

                match res {
                    Some(Ok(())) => {
                        self.connected = true;
                        self.state = VuState::Iterating;
                        ctx.counters.connect(true);
                        debug!("Connected to {} targets", self.connections.len());
                    }
                    Some(Err(err)) => {
                        error!("{err}");
                        ctx.counters.connect(false);
                        self.teardown(ctx).await;
                        return VuExit::ConnectFailed(err);
                    }
                    None => {
                        debug!("Retired while connecting");
                        ctx.counters.connect_abandoned();
                        self.teardown(ctx).await;
                        return VuExit::RetiredWhileConnecting;
                    }
                }
            }

            self.iterate(ctx).await;

            if *stop.borrow() {
                break;
            }

            if ctx.plan.sleep.is_zero() {
                // NOTE: Clients which complete without ever suspending would otherwise starve the
                // scheduler on a single-threaded runtime.
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(ctx.plan.sleep) => {},
                    _ = stop_requested(&mut stop) => {},
                }
            }

            if *stop.borrow() {
                break;
            }
        }

        self.state = VuState::Stopping;
        trace!("Stopping after {} iterations", self.iteration);
        self.teardown(ctx).await;
        VuExit::Stopped {
            iterations: self.iteration,
        }
    }

    /// Opens one connection per target, in plan order. Connections opened before a failure stay
    /// in `self.connections` so teardown can close them.
    async fn connect(&mut self, ctx: &RunContext<C>) -> Result<(), ConnectError> {
        for (idx, target) in ctx.plan.targets.iter().enumerate() {
            let connect = ctx.client.connect(&target.endpoint, &target.options);
            let conn = match target.options.timeout {
                Some(timeout) => tokio::time::timeout(timeout, connect)
                    .await
                    .map_err(|_| {
                        ConnectError::new(
                            &target.endpoint,
                            format!(
                                "timed out after {}",
                                humantime::format_duration(timeout)
                            ),
                        )
                    })??,
                None => connect.await?,
            };

            ctx.counters.connection_opened();
            trace!("Connected to {} ({})", target.name, target.endpoint);
            self.connections.push(OpenConnection { target: idx, conn });
        }
        Ok(())
    }

    async fn iterate(&mut self, ctx: &RunContext<C>) {
        let start = Instant::now();

        for (position, open) in self.connections.iter_mut().enumerate() {
            let target = &ctx.plan.targets[open.target];
            let payload = (ctx.payload)(&IterationInfo {
                vu: self.id,
                iteration: self.iteration,
                client: position + 1,
                target,
            });

            match ctx
                .client
                .invoke(&mut open.conn, &target.method, &payload)
                .await
            {
                Ok(result) => {
                    ctx.counters.invocation(false);
                    ctx.trends.record_duration(RPC_REQ_DURATION, result.latency);
                    for check in &target.checks {
                        ctx.checks.record(&check.name, check.evaluate(&result));
                    }
                }
                Err(err) => {
                    warn!(
                        "{err} (target={}, group={})",
                        target.name,
                        target.group.as_deref().unwrap_or("-")
                    );
                    ctx.counters.invocation(true);
                    for check in &target.checks {
                        ctx.checks.record(&check.name, false);
                    }
                }
            }
        }

        ctx.trends
            .record_duration(ITERATION_DURATION, start.elapsed());
        ctx.counters.iteration();
        self.iteration += 1;
    }

    /// Closes every open connection. Idempotent: closed connections are dropped from the user, so
    /// a second call has nothing left to close.
    pub async fn teardown(&mut self, ctx: &RunContext<C>) {
        for mut open in self.connections.drain(..) {
            match ctx.client.close(&mut open.conn).await {
                Ok(()) => ctx.counters.connection_closed(true),
                Err(err) => {
                    warn!(vu = self.id, "{err}");
                    ctx.counters.connection_closed(false);
                }
            }
        }
        self.state = VuState::Closed;
    }
}
