//! Poll-driven batch scheduler with bounded concurrency and graceful drain.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::config::BatchSchedulerConfig;
use crate::core::{AdmissionError, Spawn};

type DispatchFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A queued unit of work. Invoking `start` with the release guard for its
/// running slot produces the future that executes the action and settles the
/// caller.
struct QueuedTask<S> {
    start: Box<dyn FnOnce(RunningRelease<S>) -> DispatchFuture + Send + 'static>,
}

/// Scheduler state machine data. Idle: `timer_active` is false. Active: the
/// tick loop for `timer_epoch` is running. Draining: `drain` is present;
/// there is no way back to accepting submissions.
struct SchedulerState<S> {
    queue: VecDeque<QueuedTask<S>>,
    running: u32,
    timer_active: bool,
    /// Bumped on every timer start so a stale tick loop exits on its next
    /// wake instead of dispatching.
    timer_epoch: u64,
    /// Created on first `drain()`, resolved once, never recreated.
    drain: Option<watch::Sender<bool>>,
}

struct SchedulerCore<S> {
    interval: Duration,
    max_concurrent: u32,
    spawner: S,
    state: Mutex<SchedulerState<S>>,
}

impl<S> SchedulerCore<S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn spawn_tick_loop(core: &Arc<Self>, epoch: u64) {
        let tick = Arc::clone(core);
        let period = core.interval;
        core.spawner.spawn(async move {
            // First tick fires one full interval after the timer starts.
            let mut ticks =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticks.tick().await;
                if !Self::on_tick(&tick, epoch) {
                    break;
                }
            }
        });
    }

    /// One dispatch pass. Returns false once this tick loop must exit:
    /// either it is stale (stopped or superseded) or the scheduler just
    /// went idle.
    fn on_tick(core: &Arc<Self>, epoch: u64) -> bool {
        let mut dispatched = Vec::new();
        let keep_ticking = {
            let mut state = core.state.lock();
            if !state.timer_active || state.timer_epoch != epoch {
                return false;
            }
            if state.running == 0 && state.queue.is_empty() {
                if let Some(latch) = &state.drain {
                    // send_replace, not send: the value must stick even if
                    // every receiver has been dropped by now.
                    let _ = latch.send_replace(true);
                    tracing::debug!("drain complete");
                }
                state.timer_active = false;
                tracing::debug!("scheduler idle, tick timer stopped");
                false
            } else {
                while state.running < core.max_concurrent {
                    let Some(task) = state.queue.pop_front() else {
                        break;
                    };
                    state.running += 1;
                    let release = RunningRelease {
                        core: Arc::clone(core),
                    };
                    dispatched.push((task.start)(release));
                }
                true
            }
        };
        if !dispatched.is_empty() {
            tracing::debug!(batch = dispatched.len(), "tick dispatched tasks");
        }
        for fut in dispatched {
            core.spawner.spawn(fut);
        }
        keep_ticking
    }
}

/// Decrements the running count when a dispatched task settles, whatever the
/// outcome. Dropped strictly before the caller's future resolves. No wake
/// happens here: dispatch decisions are made only at tick boundaries.
struct RunningRelease<S> {
    core: Arc<SchedulerCore<S>>,
}

impl<S> Drop for RunningRelease<S> {
    fn drop(&mut self) {
        let mut state = self.core.state.lock();
        state.running -= 1;
        tracing::trace!(running = state.running, "task settled");
    }
}

/// Future returned by [`PollingBatchScheduler::run`], resolving to the
/// action's output once the task has been dispatched and has settled.
///
/// If the scheduler is dropped wholesale before the task runs, the
/// submission never resolves: queued work is never cancelled or rejected,
/// so there is no failure to report.
pub struct Submission<T> {
    inner: SubmissionInner<T>,
}

enum SubmissionInner<T> {
    Waiting(oneshot::Receiver<T>),
    Orphaned,
}

impl<T> Future for Submission<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        match &mut this.inner {
            SubmissionInner::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(value)) => Poll::Ready(value),
                Poll::Ready(Err(_)) => {
                    this.inner = SubmissionInner::Orphaned;
                    Poll::Pending
                }
                Poll::Pending => Poll::Pending,
            },
            SubmissionInner::Orphaned => Poll::Pending,
        }
    }
}

/// Poll-driven scheduler that bounds concurrency only, dispatching queued
/// tasks in FIFO order on a fixed tick.
///
/// The tick timer starts lazily on the first submission and stops on the
/// first tick that finds nothing queued and nothing running. Because
/// dispatch happens only at tick boundaries, a task can wait up to one
/// interval even when capacity is immediately available.
///
/// Cloning is cheap and all clones share the same queue and state machine.
pub struct PollingBatchScheduler<S> {
    core: Arc<SchedulerCore<S>>,
}

impl<S> Clone for PollingBatchScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S> PollingBatchScheduler<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Create a scheduler from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::InvalidConfig`] when any parameter is zero.
    pub fn new(config: BatchSchedulerConfig, spawner: S) -> Result<Self, AdmissionError> {
        config.validate().map_err(AdmissionError::InvalidConfig)?;
        Ok(Self {
            core: Arc::new(SchedulerCore {
                interval: config.interval(),
                max_concurrent: config.max_concurrent,
                spawner,
                state: Mutex::new(SchedulerState {
                    queue: VecDeque::new(),
                    running: 0,
                    timer_active: false,
                    timer_epoch: 0,
                    drain: None,
                }),
            }),
        })
    }

    /// Enqueue `action` and return a future resolving to its output.
    ///
    /// The task is dispatched from the queue head on a later tick, subject
    /// to the concurrency cap. Lazily starts the tick timer.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::Draining`], without enqueuing anything,
    /// once [`drain`](Self::drain) has been called.
    pub fn run<F, Fut, T>(&self, action: F) -> Result<Submission<T>, AdmissionError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut state = self.core.state.lock();
        if state.drain.is_some() {
            return Err(AdmissionError::Draining);
        }

        let (tx, rx) = oneshot::channel();
        state.queue.push_back(QueuedTask {
            start: Box::new(move |release: RunningRelease<S>| -> DispatchFuture {
                Box::pin(async move {
                    let out = action().await;
                    // Reclaim the running slot before the caller can
                    // observe the outcome.
                    drop(release);
                    let _ = tx.send(out);
                })
            }),
        });
        tracing::trace!(depth = state.queue.len(), "task enqueued");

        if !state.timer_active {
            state.timer_active = true;
            state.timer_epoch += 1;
            SchedulerCore::spawn_tick_loop(&self.core, state.timer_epoch);
        }

        Ok(Submission {
            inner: SubmissionInner::Waiting(rx),
        })
    }

    /// Stop accepting submissions and wait for outstanding work to finish.
    ///
    /// Idempotent: every call observes the same latch, which resolves once a
    /// tick finds the queue empty with nothing running. Calling this on an
    /// idle scheduler (no timer running) resolves immediately. There is no
    /// way back: the scheduler refuses submissions from the first call
    /// onward, even after the drain completes.
    pub fn drain(&self) -> impl Future<Output = ()> + Send + 'static {
        let rx = {
            let mut state = self.core.state.lock();
            match &state.drain {
                Some(latch) => latch.subscribe(),
                None => {
                    let idle =
                        state.running == 0 && state.queue.is_empty() && !state.timer_active;
                    let (latch, rx) = watch::channel(idle);
                    state.drain = Some(latch);
                    tracing::debug!(idle, "drain requested");
                    rx
                }
            }
        };
        async move {
            let mut rx = rx;
            if *rx.borrow() {
                return;
            }
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
            // Scheduler dropped with the drain unresolved; stay pending.
            std::future::pending::<()>().await;
        }
    }

    /// Clear the tick timer without waiting for anything.
    ///
    /// An abrupt halt, distinct from [`drain`](Self::drain): queued and
    /// running tasks are neither rejected nor awaited, and a pending drain
    /// is not resolved. A later [`run`](Self::run) restarts the timer.
    pub fn stop(&self) {
        let mut state = self.core.state.lock();
        state.timer_active = false;
        tracing::debug!(
            queued = state.queue.len(),
            running = state.running,
            "tick timer cleared"
        );
    }

    /// True from the first [`drain`](Self::drain) call onward.
    pub fn is_draining(&self) -> bool {
        self.core.state.lock().drain.is_some()
    }
}
