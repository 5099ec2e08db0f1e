//! End-to-end throughput shape for the windowed rate limiter.
//!
//! Mirrors the acceptance harness: a limiter configured for 5 admissions per
//! 1000ms window with 10 concurrent slots receives 30 immediate-return
//! tasks; completion timestamps are grouped by elapsed whole second and the
//! per-second counts are printed. The burst must spread into six windows of
//! five completions each, with no window over quota.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use taskgate::config::LimiterConfig;
use taskgate::core::{AppResult, WindowedRateLimiter};
use taskgate::runtime::TokioSpawner;
use taskgate::util::telemetry::init_tracing;
use tokio::time::Instant;

const TIME_PERIOD_MS: u64 = 1000;
const MAX_WINDOW_ACTIONS: u32 = 5;
const MAX_CONCURRENT_ACTIONS: u32 = 10;
const ACTION_COUNT: u64 = 30;

#[tokio::test(start_paused = true)]
async fn burst_of_thirty_completes_five_per_second() -> AppResult<()> {
    init_tracing();

    let limiter = WindowedRateLimiter::new(
        LimiterConfig {
            time_period_ms: TIME_PERIOD_MS,
            max_window_actions: MAX_WINDOW_ACTIONS,
            max_concurrent_actions: MAX_CONCURRENT_ACTIONS,
        },
        TokioSpawner::current(),
    )?;

    let start = Instant::now();
    let results = join_all(
        (0..ACTION_COUNT).map(|_| limiter.run(|| async { start.elapsed().as_secs() })),
    )
    .await;

    let mut per_second: BTreeMap<u64, usize> = BTreeMap::new();
    for second in results {
        *per_second.entry(second).or_insert(0) += 1;
    }
    for (second, count) in &per_second {
        println!("{second} seconds: {count}");
    }

    assert_eq!(per_second.len(), 6);
    assert!(per_second.values().all(|&count| count == 5));

    // The whole burst takes five window expirations end to end.
    assert_eq!(start.elapsed(), Duration::from_millis(5 * TIME_PERIOD_MS));
    Ok(())
}
