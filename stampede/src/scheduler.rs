//! Stage scheduler: keeps the live virtual-user population on the ramp.
mod ramp;
mod timer;

use crate::client::RpcClient;
use crate::error::SchedulerError;
use crate::progress::{stop_requested, Progress, ProgressHandle};
use crate::worker::{RunContext, VirtualUser, VuExit, VuState};
use ramp::Ramp;
use std::sync::Arc;
use std::time::Duration;
use timer::Timer;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// How often retiring workers are polled once the plan has elapsed.
const DRAIN_POLL: Duration = Duration::from_millis(100);

struct WorkerHandle<C: RpcClient> {
    id: u64,
    stop: watch::Sender<bool>,
    vu: Arc<Mutex<VirtualUser<C>>>,
    task: JoinHandle<VuExit>,
}

impl<C: RpcClient> WorkerHandle<C> {
    /// Awaits a task known to be finished (or aborted). `None` when it was cancelled.
    async fn join(&mut self) -> Result<Option<VuExit>, SchedulerError> {
        match (&mut self.task).await {
            Ok(exit) => {
                trace!("Virtual user {} exited: {exit:?}", self.id);
                Ok(Some(exit))
            }
            Err(err) if err.is_panic() => {
                error!("Virtual user {} panicked", self.id);
                Err(SchedulerError::WorkerPanicked { id: self.id })
            }
            Err(_) => Ok(None),
        }
    }
}

pub(crate) struct TeardownStats {
    /// Workers still counted live when the scheduler was torn down.
    pub live: usize,
    /// Workers that had to be aborted.
    pub abnormal: usize,
}

pub(crate) struct Scheduler<C: RpcClient> {
    ctx: Arc<RunContext<C>>,
    ramp: Ramp,
    active: Vec<WorkerHandle<C>>,
    retiring: Vec<WorkerHandle<C>>,
    next_id: u64,
    vus_max: usize,
    start: Instant,
    progress: ProgressHandle,
}

impl<C: RpcClient> Scheduler<C> {
    pub fn new(ctx: Arc<RunContext<C>>, progress: ProgressHandle) -> Self {
        Self {
            ramp: Ramp::new(&ctx.plan.stages),
            ctx,
            active: vec![],
            retiring: vec![],
            next_id: 1,
            vus_max: 0,
            start: Instant::now(),
            progress,
        }
    }

    pub fn vus_max(&self) -> usize {
        self.vus_max
    }

    /// Runs the plan until every stage has elapsed (or a stop is requested), then retires all
    /// workers and waits up to the graceful stop period for them to finish.
    pub async fn drive(&mut self, mut stop: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        let total = self.ramp.total_duration();
        self.start = Instant::now();
        let end = self.start + total;
        let mut timer = Timer::new(self.ctx.plan.tick).await;
        debug!("Scheduler ticking every {timer} for {}", humantime::format_duration(total));

        loop {
            self.reap().await?;

            let elapsed = self.start.elapsed();
            if elapsed >= total {
                debug!("All stages elapsed");
                break;
            }
            if *stop.borrow() {
                info!("Stop requested");
                break;
            }

            let target = self.ramp.population_at(elapsed);
            self.set_population(target);
            self.publish(elapsed, target);

            tokio::select! {
                _ = timer.tick() => {},
                _ = tokio::time::sleep_until(end) => {},
                _ = stop_requested(&mut stop) => {},
            }
        }

        self.set_population(0);
        let deadline = Instant::now() + self.ctx.plan.graceful_stop;
        loop {
            self.reap().await?;
            self.publish(self.start.elapsed(), 0);

            if self.retiring.is_empty() {
                break;
            }

            if Instant::now() >= deadline {
                warn!(
                    "{} virtual users did not stop within the graceful stop period",
                    self.retiring.len()
                );
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(DRAIN_POLL) => {},
                _ = tokio::time::sleep_until(deadline) => {},
            }
        }

        Ok(())
    }

    /// Spawns or retires workers until `population` are live. The most recently spawned workers
    /// are retired first.
    fn set_population(&mut self, population: usize) {
        if self.active.len() < population {
            trace!("Spawning {} virtual users", population - self.active.len());
            while self.active.len() < population {
                let worker = self.spawn();
                self.active.push(worker);
            }
        } else if self.active.len() > population {
            trace!("Retiring {} virtual users", self.active.len() - population);
            for worker in self.active.drain(population..) {
                worker.stop.send_replace(true);
                self.retiring.push(worker);
            }
        }

        self.vus_max = self.vus_max.max(self.active.len());
    }

    fn spawn(&mut self) -> WorkerHandle<C> {
        let id = self.next_id;
        self.next_id += 1;

        let (stop, stop_rx) = watch::channel(false);
        let vu = Arc::new(Mutex::new(VirtualUser::new(id)));
        let task = tokio::spawn({
            let vu = vu.clone();
            let ctx = self.ctx.clone();
            async move {
                // NOTE: Held for the task's whole lifetime; teardown only gets it back once the
                // task has finished or been aborted.
                let mut vu = vu.lock().await;
                vu.run(&ctx, stop_rx).await
            }
        });

        WorkerHandle { id, stop, vu, task }
    }

    /// Joins every finished worker. Live workers that exited on their own (failed connect) are
    /// removed and get replaced on the next population update.
    async fn reap(&mut self) -> Result<(), SchedulerError> {
        let dead = reap_finished(&self.ctx, &mut self.active).await?;
        if dead > 0 {
            debug!("Reaped {dead} virtual users that exited early");
        }
        let retired = reap_finished(&self.ctx, &mut self.retiring).await?;
        if retired > 0 {
            trace!("Reaped {retired} retired virtual users");
        }
        Ok(())
    }

    fn publish(&self, elapsed: Duration, target: usize) {
        self.progress.publish(Progress {
            elapsed,
            stage: self.ramp.stage_at(elapsed),
            target,
            live: self.active.len(),
            retiring: self.retiring.len(),
        });
    }

    /// Aborts any worker still running and closes whatever connections it left open. Consumes the
    /// scheduler so it can only happen once.
    pub async fn teardown(mut self) -> TeardownStats {
        let live = self.active.len();
        let mut abnormal = 0;

        let workers: Vec<_> = self
            .active
            .drain(..)
            .chain(self.retiring.drain(..))
            .collect();

        for mut worker in workers {
            if !worker.task.is_finished() {
                warn!("Force-terminating virtual user {}", worker.id);
                worker.task.abort();
                abnormal += 1;
            }

            if let Err(err) = worker.join().await {
                error!("{err}");
            }

            let mut vu = worker.vu.lock().await;
            if vu.state() == VuState::Connecting {
                self.ctx.counters.connect_abandoned();
            }
            vu.teardown(&self.ctx).await;
        }

        self.publish(self.start.elapsed(), 0);
        TeardownStats { live, abnormal }
    }
}

async fn reap_finished<C: RpcClient>(
    ctx: &RunContext<C>,
    workers: &mut Vec<WorkerHandle<C>>,
) -> Result<usize, SchedulerError> {
    let mut reaped = 0;
    let mut idx = 0;
    while idx < workers.len() {
        if workers[idx].task.is_finished() {
            let mut worker = workers.remove(idx);
            match worker.join().await {
                Ok(Some(VuExit::ConnectFailed(err))) => {
                    debug!("Virtual user {} could not connect: {err}", worker.id);
                }
                Ok(Some(VuExit::Stopped { iterations })) => {
                    trace!("Virtual user {} stopped after {iterations} iterations", worker.id);
                }
                Ok(_) => {}
                Err(err) => {
                    // NOTE: A panicked worker never reached its own teardown.
                    worker.vu.lock().await.teardown(ctx).await;
                    return Err(err);
                }
            }
            reaped += 1;
        } else {
            idx += 1;
        }
    }
    Ok(reaped)
}
