//! Builders to construct admission components from configuration.

use std::collections::HashMap;

use crate::config::ThrottleConfig;
use crate::core::{AdmissionError, PollingBatchScheduler, Spawn, WindowedRateLimiter};

/// Build every limiter named in the configuration, keyed by name.
///
/// # Errors
///
/// Returns [`AdmissionError::InvalidConfig`] when the configuration fails
/// validation.
pub fn build_limiters<S>(
    cfg: &ThrottleConfig,
    spawner: S,
) -> Result<HashMap<String, WindowedRateLimiter<S>>, AdmissionError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(AdmissionError::InvalidConfig)?;

    let mut limiters = HashMap::new();
    for (name, limiter_cfg) in &cfg.limiters {
        let limiter = WindowedRateLimiter::new(limiter_cfg.clone(), spawner.clone())?;
        limiters.insert(name.clone(), limiter);
    }
    Ok(limiters)
}

/// Build every scheduler named in the configuration, keyed by name.
///
/// # Errors
///
/// Returns [`AdmissionError::InvalidConfig`] when the configuration fails
/// validation.
pub fn build_schedulers<S>(
    cfg: &ThrottleConfig,
    spawner: S,
) -> Result<HashMap<String, PollingBatchScheduler<S>>, AdmissionError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(AdmissionError::InvalidConfig)?;

    let mut schedulers = HashMap::new();
    for (name, scheduler_cfg) in &cfg.schedulers {
        let scheduler = PollingBatchScheduler::new(scheduler_cfg.clone(), spawner.clone())?;
        schedulers.insert(name.clone(), scheduler);
    }
    Ok(schedulers)
}
