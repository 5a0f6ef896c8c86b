use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// What the scheduler last decided, published once per tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub elapsed: Duration,
    /// Index of the stage `elapsed` falls in; `None` once the plan has elapsed.
    pub stage: Option<usize>,
    pub target: usize,
    pub live: usize,
    pub retiring: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = Duration::from_secs(self.elapsed.as_secs());
        write!(
            f,
            "[{}] stage={} vus={}/{} retiring={}",
            humantime::format_duration(elapsed),
            self.stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.live,
            self.target,
            self.retiring,
        )
    }
}

/// Read-only view of the latest [`Progress`]; cheap to clone and poll from any thread.
#[derive(Clone, Debug, Default)]
pub struct ProgressHandle {
    inner: Arc<ArcSwap<Progress>>,
}

impl ProgressHandle {
    pub fn current(&self) -> Arc<Progress> {
        self.inner.load_full()
    }

    pub(crate) fn publish(&self, progress: Progress) {
        self.inner.store(Arc::new(progress));
    }
}

/// Requests an early, graceful end of a run. Workers finish their current iteration, then the
/// run tears down as if the plan had elapsed.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once `stop` turns true, or once its sender is gone.
pub(crate) async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
