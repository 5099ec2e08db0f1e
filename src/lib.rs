//! # Taskgate
//!
//! Admission-control primitives for throttling asynchronous work.
//!
//! This library provides two small, independently usable components that
//! decide *when* a submitted unit of async work may begin executing. Both
//! expose the same shape of public operation (submit a deferred action,
//! receive its eventual result) but implement admission differently, so
//! callers can pick the trade-off that fits their workload, or offer both.
//!
//! ## Components
//!
//! - [`core::WindowedRateLimiter`]: **event-driven, dual-constraint**.
//!   Bounds both the number of actions in flight and the number of actions
//!   started per rolling time window. Callers that cannot be admitted
//!   immediately are parked and resumed in strict arrival order the instant
//!   a constraint-satisfying state change occurs.
//! - [`core::PollingBatchScheduler`]: **poll-driven, concurrency-bound**.
//!   Queues submitted work and dispatches from the queue head on a fixed
//!   tick, up to a concurrency cap. Supports graceful drain and abrupt stop.
//!   A task can wait up to one tick interval even when capacity is free;
//!   that added latency is the scheduler's defining trade-off against the
//!   event-driven limiter.
//!
//! ## Example
//!
//! ```rust,ignore
//! use taskgate::config::LimiterConfig;
//! use taskgate::core::WindowedRateLimiter;
//! use taskgate::runtime::TokioSpawner;
//!
//! let limiter = WindowedRateLimiter::new(
//!     LimiterConfig {
//!         time_period_ms: 1_000,
//!         max_window_actions: 5,
//!         max_concurrent_actions: 10,
//!     },
//!     TokioSpawner::current(),
//! )?;
//!
//! // At most 5 fetches started per second, at most 10 in flight.
//! let body = limiter.run(|| fetch_page(url)).await;
//! ```
//!
//! For complete examples, see:
//! - `tests/limiter_test.rs` and `tests/scheduler_test.rs` - behavior tests
//! - `tests/throughput_test.rs` - end-to-end throughput shape

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission primitives and shared traits.
pub mod core;
/// Configuration models for limiters and schedulers.
pub mod config;
/// Builders to construct admission components from configuration.
pub mod builders;
/// Runtime adapters for spawning background futures.
pub mod runtime;
/// Shared utilities.
pub mod util;
