//! Configuration models for limiters and schedulers.

pub mod throttle;

pub use throttle::{BatchSchedulerConfig, LimiterConfig, ThrottleConfig};
