//! Behavior tests for the windowed rate limiter.
//!
//! These validate the admission contract:
//! 1. Both constraints are enforced at every instant
//! 2. Deferred callers are admitted in strict arrival order
//! 3. Action failures propagate verbatim while capacity is reclaimed
//! 4. Teardown leaves parked callers suspended
//!
//! Timing-sensitive tests run on the paused tokio clock, so every asserted
//! duration is exact.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use taskgate::config::LimiterConfig;
use taskgate::core::WindowedRateLimiter;
use taskgate::runtime::TokioSpawner;
use tokio::time::{sleep, timeout, Instant};

fn limiter(
    time_period_ms: u64,
    max_window_actions: u32,
    max_concurrent_actions: u32,
) -> WindowedRateLimiter<TokioSpawner> {
    WindowedRateLimiter::new(
        LimiterConfig {
            time_period_ms,
            max_window_actions,
            max_concurrent_actions,
        },
        TokioSpawner::current(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn tasks_within_both_bounds_start_immediately() {
    // Three 500ms tasks against a 5-per-second window and 3 concurrent
    // slots: nothing is window-limited yet, so all start at once and all
    // finish together around t=500ms.
    let limiter = limiter(1000, 5, 3);
    let start = Instant::now();

    let results = join_all((0..3).map(|_| {
        limiter.run(|| async {
            sleep(Duration::from_millis(500)).await;
            start.elapsed()
        })
    }))
    .await;

    for elapsed in results {
        assert_eq!(elapsed, Duration::from_millis(500));
    }
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_the_bound() {
    let limiter = limiter(60_000, 100, 3);
    let current = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    join_all((0..9).map(|_| {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        limiter.run(move || async move {
            let now_running = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now_running, Ordering::SeqCst);
            sleep(Duration::from_millis(100)).await;
            current.fetch_sub(1, Ordering::SeqCst);
        })
    }))
    .await;

    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(current.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn window_quota_spreads_a_burst_across_periods() {
    // 30 instant tasks against 5 admissions per second: five complete in
    // each of six consecutive one-second windows.
    let limiter = limiter(1000, 5, 10);
    let start = Instant::now();

    let results = join_all((0..30).map(|_| limiter.run(|| async { start.elapsed().as_secs() }))).await;

    let mut per_second: BTreeMap<u64, u32> = BTreeMap::new();
    for second in results {
        *per_second.entry(second).or_insert(0) += 1;
    }
    assert_eq!(per_second.len(), 6);
    for (second, count) in per_second {
        assert!(second < 6);
        assert_eq!(count, 5);
    }
}

#[tokio::test(start_paused = true)]
async fn deferred_callers_are_admitted_in_arrival_order() {
    let limiter = limiter(100, 1, 10);
    let order = Arc::new(Mutex::new(Vec::new()));

    join_all((0..5).map(|i| {
        let order = Arc::clone(&order);
        limiter.run(move || async move {
            order.lock().unwrap().push(i);
        })
    }))
    .await;

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn independent_instances_share_no_state() {
    let a = limiter(1000, 1, 1);
    let b = limiter(1000, 1, 1);
    let start = Instant::now();

    let (from_a, from_b) = tokio::join!(
        a.run(|| async { start.elapsed() }),
        b.run(|| async { start.elapsed() }),
    );

    // Each limiter has a single slot, yet neither submission waits on the
    // other's counters.
    assert_eq!(from_a, Duration::ZERO);
    assert_eq!(from_b, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn one_failing_action_rejects_only_its_own_caller() {
    let limiter = limiter(1000, 10, 10);

    let results: Vec<Result<u32, String>> = join_all((0..10).map(|i| {
        limiter.run(move || async move {
            if i == 3 {
                Err(format!("boom {i}"))
            } else {
                Ok(i)
            }
        })
    }))
    .await;

    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    assert_eq!(results[3], Err("boom 3".to_string()));

    // Capacity is fully reclaimed once the window expires: a second burst
    // of the same size is admitted without any deferral.
    sleep(Duration::from_millis(1100)).await;
    let resumed = Instant::now();
    let second: Vec<Duration> =
        join_all((0..10).map(|_| limiter.run(|| async { resumed.elapsed() }))).await;
    for elapsed in second {
        assert_eq!(elapsed, Duration::ZERO);
    }
    assert_eq!(limiter.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn destroy_leaves_parked_callers_suspended() {
    let limiter = limiter(1000, 1, 10);
    // Hold the single window slot.
    limiter.run(|| async {}).await;

    let deferred = limiter.run(|| async { "never" });
    tokio::pin!(deferred);
    // Drive the caller into the wait queue.
    assert!(timeout(Duration::ZERO, &mut deferred).await.is_err());
    assert_eq!(limiter.waiting(), 1);

    limiter.destroy();

    // The window slot expires at t=1000 and the concurrency counter is
    // already free, but a destroyed limiter wakes no one.
    assert!(timeout(Duration::from_millis(5000), &mut deferred)
        .await
        .is_err());
    assert_eq!(limiter.waiting(), 1);
}

#[tokio::test(start_paused = true)]
async fn destroy_does_not_block_immediate_admission() {
    // Teardown stops wake notifications, not admission arithmetic: with
    // free capacity and nobody parked, a call still runs.
    let limiter = limiter(1000, 5, 5);
    limiter.destroy();
    assert_eq!(limiter.run(|| async { 7 }).await, 7);
}
