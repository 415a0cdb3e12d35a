//! Recurring polling tasks with per-task single-flight guards
//!
//! Every registered [`PollTask`] gets its own timer loop. On each tick the
//! loop spawns one run of the task's action; a run that finds the previous
//! run of the same task still outstanding returns at once. Tasks never wait
//! on each other, and a failing action is logged and forgotten so the next
//! tick runs normally.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::metrics::{record_task_outcome, RunOutcome};

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;
type TaskAction = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Shortest period a task runs at; a zero period is raised to this.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Non-blocking latch allowing at most one holder at a time.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the latch if it is free. It is released when the permit drops,
    /// whichever way the holder exits.
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[must_use = "the latch is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A named recurring action. Clones share the guard.
#[derive(Clone)]
pub struct PollTask {
    name: &'static str,
    period: Duration,
    guard: SingleFlight,
    action: TaskAction,
}

impl PollTask {
    pub fn new<F, Fut>(name: &'static str, period: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let period = if period < MIN_PERIOD {
            warn!(
                task = name,
                period_ms = MIN_PERIOD.as_millis() as u64,
                "Poll period must be positive, using the minimum"
            );
            MIN_PERIOD
        } else {
            period
        };

        Self {
            name,
            period,
            guard: SingleFlight::new(),
            action: Arc::new(move || Box::pin(action()) as TaskFuture),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_held()
    }
}

impl std::fmt::Debug for PollTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Run `task` once unless a previous run is still outstanding.
pub async fn run_task(task: &PollTask) -> RunOutcome {
    let Some(_permit) = task.guard.try_acquire() else {
        debug!(task = task.name, "Previous run still in flight, skipping");
        record_task_outcome(task.name, RunOutcome::Skipped);
        return RunOutcome::Skipped;
    };

    let outcome = match (task.action)().await {
        Ok(()) => {
            debug!(task = task.name, "Poll task completed");
            RunOutcome::Completed
        }
        Err(e) => {
            warn!(task = task.name, error = %e, "Poll task failed");
            RunOutcome::Failed
        }
    };
    record_task_outcome(task.name, outcome);
    outcome
}

#[derive(Debug, Default)]
pub struct PollingScheduler {
    tasks: Vec<PollTask>,
}

impl PollingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: PollTask) -> &mut Self {
        info!(
            task = task.name,
            period_ms = task.period.as_millis() as u64,
            "Registered poll task"
        );
        self.tasks.push(task);
        self
    }

    pub fn tasks(&self) -> &[PollTask] {
        &self.tasks
    }

    /// Start one timer loop per task. Must be called inside a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loops = self
            .tasks
            .into_iter()
            .map(|task| tokio::spawn(run_loop(task, shutdown_rx.clone())))
            .collect();

        SchedulerHandle {
            shutdown: shutdown_tx,
            loops,
        }
    }
}

async fn run_loop(task: PollTask, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(task.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let task = task.clone();
                tokio::spawn(async move {
                    run_task(&task).await;
                });
            }
        }
    }

    debug!(task = task.name, "Poll loop stopped");
}

/// Stops every timer loop at once. Runs already spawned finish on their own.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.loops {
            if let Err(e) = handle.await {
                warn!(error = %e, "Poll loop ended abnormally");
            }
        }
        info!("Polling scheduler stopped");
    }
}
