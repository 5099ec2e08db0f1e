//! Core admission primitives and shared traits.

pub mod error;
pub mod limiter;
pub mod scheduler;
pub mod spawn;

pub use error::{AdmissionError, AppResult};
pub use limiter::WindowedRateLimiter;
pub use scheduler::{PollingBatchScheduler, Submission};
pub use spawn::Spawn;
