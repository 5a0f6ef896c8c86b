//! In-process client used by the unit tests.
use crate::client::{ConnectError, InvokeError, Payload, RpcClient, TeardownError};
use stampede_core::{
    Check, ConnectOptions, Endpoint, InvocationResult, RunPlan, Stage, Status, Target,
    DEFAULT_RPC_METHOD,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A plan with `targets` targets named `client`, `client2`, ... whose endpoint host is the target
/// name, each with a single `status{N} is OK` check.
pub(crate) fn plan(stages: &[Stage], targets: usize) -> RunPlan {
    RunPlan::new(stages).targets((0..targets).map(|idx| {
        let suffix = if idx == 0 {
            String::new()
        } else {
            (idx + 1).to_string()
        };
        let name = format!("client{suffix}");
        Target::new(
            &name,
            Endpoint::new(&name, Some(50051)),
            DEFAULT_RPC_METHOD,
        )
        .check(Check::status_ok(&format!("status{suffix} is OK")))
    }))
}

#[derive(Clone, Debug)]
struct MockConfig {
    fail_connect: HashSet<String>,
    fail_invoke: HashSet<String>,
    fail_close: HashSet<String>,
    connect_delay: Duration,
    latency: Duration,
    status: Status,
    hang: bool,
    panic: bool,
}

#[derive(Debug, Default)]
struct MockStats {
    connects: AtomicU64,
    closes: AtomicU64,
    double_closes: AtomicU64,
    close_failures: AtomicU64,
    invocations: AtomicU64,
}

#[derive(Clone, Debug)]
pub(crate) struct MockClient {
    config: Arc<MockConfig>,
    stats: Arc<MockStats>,
}

pub(crate) struct MockConnection {
    host: String,
    open: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig {
                fail_connect: HashSet::new(),
                fail_invoke: HashSet::new(),
                fail_close: HashSet::new(),
                connect_delay: Duration::ZERO,
                latency: Duration::from_millis(5),
                status: Status::Ok,
                hang: false,
                panic: false,
            }),
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn fail_connect_to(mut self, host: &str) -> Self {
        Arc::make_mut(&mut self.config)
            .fail_connect
            .insert(host.to_string());
        self
    }

    pub fn fail_invoke_on(mut self, host: &str) -> Self {
        Arc::make_mut(&mut self.config)
            .fail_invoke
            .insert(host.to_string());
        self
    }

    pub fn fail_close_on(mut self, host: &str) -> Self {
        Arc::make_mut(&mut self.config)
            .fail_close
            .insert(host.to_string());
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        Arc::make_mut(&mut self.config).connect_delay = delay;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        Arc::make_mut(&mut self.config).latency = latency;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        Arc::make_mut(&mut self.config).status = status;
        self
    }

    /// Every invoke stays pending forever.
    pub fn hang(mut self) -> Self {
        Arc::make_mut(&mut self.config).hang = true;
        self
    }

    /// Every invoke panics.
    pub fn panic(mut self) -> Self {
        Arc::make_mut(&mut self.config).panic = true;
        self
    }

    /// Successful connects.
    pub fn connects(&self) -> u64 {
        self.stats.connects.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> u64 {
        self.stats.closes.load(Ordering::Relaxed)
    }

    pub fn double_closes(&self) -> u64 {
        self.stats.double_closes.load(Ordering::Relaxed)
    }

    pub fn close_failures(&self) -> u64 {
        self.stats.close_failures.load(Ordering::Relaxed)
    }

    pub fn invocations(&self) -> u64 {
        self.stats.invocations.load(Ordering::Relaxed)
    }
}

impl RpcClient for MockClient {
    type Connection = MockConnection;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        _options: &ConnectOptions,
    ) -> Result<MockConnection, ConnectError> {
        if !self.config.connect_delay.is_zero() {
            tokio::time::sleep(self.config.connect_delay).await;
        }

        if self.config.fail_connect.contains(endpoint.host()) {
            return Err(ConnectError::new(endpoint, "connection refused"));
        }

        self.stats.connects.fetch_add(1, Ordering::Relaxed);
        Ok(MockConnection {
            host: endpoint.host().to_string(),
            open: true,
        })
    }

    async fn invoke(
        &self,
        connection: &mut MockConnection,
        method: &str,
        _payload: &Payload,
    ) -> Result<InvocationResult, InvokeError> {
        self.stats.invocations.fetch_add(1, Ordering::Relaxed);

        if self.config.panic {
            panic!("mock invoke panicked");
        }

        if self.config.hang {
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(self.config.latency).await;

        if self.config.fail_invoke.contains(&connection.host) {
            return Err(InvokeError::new(method, "stream reset"));
        }

        Ok(InvocationResult::new(
            self.config.status,
            format!("Hello from {}", connection.host),
            self.config.latency,
        ))
    }

    async fn close(&self, connection: &mut MockConnection) -> Result<(), TeardownError> {
        if !connection.open {
            self.stats.double_closes.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        connection.open = false;
        if self.config.fail_close.contains(&connection.host) {
            self.stats.close_failures.fetch_add(1, Ordering::Relaxed);
            return Err(TeardownError::new("goaway not acknowledged"));
        }
        self.stats.closes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
