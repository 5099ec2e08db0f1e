//! Dual-constraint rate limiter with fair FIFO admission.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::LimiterConfig;
use crate::core::{AdmissionError, Spawn};

/// Mutable admission state. Only `LimiterCore` touches these fields; callers
/// interact exclusively through admit/release operations so the bound
/// invariants cannot be violated from outside.
struct LimiterState {
    /// Admissions whose window slot has not yet expired.
    window_count: u32,
    /// Admitted actions not yet settled.
    concurrent_count: u32,
    /// Parked callers, oldest first.
    waiters: VecDeque<oneshot::Sender<()>>,
    /// Set by `destroy()`; release paths stop waking parked callers.
    destroyed: bool,
}

struct LimiterCore<S> {
    time_period: Duration,
    max_window_actions: u32,
    max_concurrent_actions: u32,
    spawner: S,
    state: Mutex<LimiterState>,
}

impl<S> LimiterCore<S> {
    fn has_capacity(&self, state: &LimiterState) -> bool {
        state.window_count < self.max_window_actions
            && state.concurrent_count < self.max_concurrent_actions
    }
}

impl<S> LimiterCore<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Schedule the fixed-expiry decay for one admission's window slot.
    /// Every admission gets its own timer, independent of all others.
    fn spawn_window_decay(core: &Arc<Self>) {
        let decay = Arc::clone(core);
        let period = core.time_period;
        core.spawner.spawn(async move {
            tokio::time::sleep(period).await;
            Self::release_window(&decay);
        });
    }

    fn release_window(core: &Arc<Self>) {
        let mut state = core.state.lock();
        state.window_count -= 1;
        tracing::trace!(window = state.window_count, "window slot expired");
        Self::wake_waiters(core, &mut state);
    }

    fn release_concurrent(core: &Arc<Self>) {
        let mut state = core.state.lock();
        state.concurrent_count -= 1;
        tracing::trace!(concurrent = state.concurrent_count, "action settled");
        Self::wake_waiters(core, &mut state);
    }

    /// Admit parked callers while both constraints hold, oldest first.
    ///
    /// The releasing side reserves both counters on the waiter's behalf under
    /// the same lock section that performed the release, so one freed unit
    /// admits exactly one waiter and two waiters can never race for a slot.
    fn wake_waiters(core: &Arc<Self>, state: &mut LimiterState) {
        if state.destroyed {
            return;
        }
        while core.has_capacity(state) {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            state.window_count += 1;
            state.concurrent_count += 1;
            if waiter.send(()).is_ok() {
                Self::spawn_window_decay(core);
                tracing::debug!(waiting = state.waiters.len(), "parked caller admitted");
            } else {
                // Caller went away before admission; hand the slot back.
                state.window_count -= 1;
                state.concurrent_count -= 1;
            }
        }
    }
}

/// Decrements the concurrency counter when the action settles, whatever the
/// outcome. Dropped strictly before the caller's future resolves, so a caller
/// can never observe a result while its capacity is still held.
struct ConcurrencyRelease<S>
where
    S: Spawn + Send + Sync + 'static,
{
    core: Arc<LimiterCore<S>>,
}

impl<S> Drop for ConcurrencyRelease<S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn drop(&mut self) {
        LimiterCore::release_concurrent(&self.core);
    }
}

/// Event-driven rate limiter that bounds both actions in flight and actions
/// started per time window.
///
/// An action is admitted the moment `window_count < max_window_actions` and
/// `concurrent_count < max_concurrent_actions` both hold; otherwise the
/// caller is parked and resumed in strict arrival order as soon as a
/// constraint-satisfying state change occurs. Each admission opens a window
/// slot that expires exactly `time_period` later on its own timer, an
/// approximate fixed-expiry model rather than a recomputed sliding window.
///
/// Cloning is cheap and all clones share the same counters.
pub struct WindowedRateLimiter<S> {
    core: Arc<LimiterCore<S>>,
}

impl<S> Clone for WindowedRateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S> WindowedRateLimiter<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Create a limiter from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::InvalidConfig`] when any parameter is zero.
    pub fn new(config: LimiterConfig, spawner: S) -> Result<Self, AdmissionError> {
        config.validate().map_err(AdmissionError::InvalidConfig)?;
        Ok(Self {
            core: Arc::new(LimiterCore {
                time_period: config.time_period(),
                max_window_actions: config.max_window_actions,
                max_concurrent_actions: config.max_concurrent_actions,
                spawner,
                state: Mutex::new(LimiterState {
                    window_count: 0,
                    concurrent_count: 0,
                    waiters: VecDeque::new(),
                    destroyed: false,
                }),
            }),
        })
    }

    /// Run `action` under both admission constraints and return its output.
    ///
    /// The action executes in place once admitted; awaiting the returned
    /// future is what drives it. Deferred callers are admitted in strict
    /// arrival order. The action's outcome (success or failure value) is
    /// handed back verbatim, and capacity is reclaimed either way.
    pub async fn run<F, Fut, T>(&self, action: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.admit().await;
        let release = ConcurrencyRelease {
            core: Arc::clone(&self.core),
        };
        let out = action().await;
        drop(release);
        out
    }

    /// Stop waking parked callers.
    ///
    /// Counters keep decrementing as in-flight actions settle and window
    /// slots expire, but callers parked at the time of the call, and any
    /// caller deferred afterwards, remain suspended forever. Immediate
    /// admission still works while capacity is free and no one is parked.
    pub fn destroy(&self) {
        let mut state = self.core.state.lock();
        state.destroyed = true;
        tracing::debug!(parked = state.waiters.len(), "limiter destroyed");
    }

    /// Number of callers currently parked awaiting admission.
    pub fn waiting(&self) -> usize {
        self.core.state.lock().waiters.len()
    }

    /// Wait until both constraints admit this caller.
    async fn admit(&self) {
        let waiter = {
            let mut state = self.core.state.lock();
            // Joining the queue tail when anyone is already parked keeps
            // admission strictly FIFO.
            if state.waiters.is_empty() && self.core.has_capacity(&state) {
                state.window_count += 1;
                state.concurrent_count += 1;
                tracing::trace!(
                    window = state.window_count,
                    concurrent = state.concurrent_count,
                    "admitted immediately"
                );
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                tracing::debug!(waiting = state.waiters.len(), "caller deferred");
                Some(rx)
            }
        };

        match waiter {
            None => LimiterCore::spawn_window_decay(&self.core),
            Some(rx) => {
                if rx.await.is_err() {
                    // The limiter was torn down while this caller was
                    // parked. Teardown does not resume waiters.
                    std::future::pending::<()>().await;
                }
                // The releasing side reserved both counters and scheduled
                // the window decay on this caller's behalf.
            }
        }
    }
}
