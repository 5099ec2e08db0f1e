//! Configuration models for admission-control components.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Windowed rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Length of the admission window in milliseconds.
    pub time_period_ms: u64,
    /// Maximum admissions whose window slot may be open simultaneously.
    pub max_window_actions: u32,
    /// Maximum simultaneously executing admissions.
    pub max_concurrent_actions: u32,
}

impl LimiterConfig {
    /// Validate limiter configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.time_period_ms == 0 {
            return Err("time_period_ms must be greater than 0".into());
        }
        if self.max_window_actions == 0 {
            return Err("max_window_actions must be greater than 0".into());
        }
        if self.max_concurrent_actions == 0 {
            return Err("max_concurrent_actions must be greater than 0".into());
        }
        Ok(())
    }

    /// Window length as a [`Duration`].
    pub fn time_period(&self) -> Duration {
        Duration::from_millis(self.time_period_ms)
    }
}

/// Polling batch scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSchedulerConfig {
    /// Tick period in milliseconds.
    pub interval_ms: u64,
    /// Maximum simultaneously executing tasks.
    pub max_concurrent: u32,
}

impl BatchSchedulerConfig {
    /// Validate scheduler configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("interval_ms must be greater than 0".into());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        Ok(())
    }

    /// Tick period as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Root admission-control configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Map of limiter name to configuration.
    #[serde(default)]
    pub limiters: HashMap<String, LimiterConfig>,
    /// Map of scheduler name to configuration.
    #[serde(default)]
    pub schedulers: HashMap<String, BatchSchedulerConfig>,
}

impl ThrottleConfig {
    /// Validate all components and ensure at least one is defined.
    pub fn validate(&self) -> Result<(), String> {
        if self.limiters.is_empty() && self.schedulers.is_empty() {
            return Err("at least one limiter or scheduler must be defined".into());
        }
        for (name, limiter) in &self.limiters {
            limiter
                .validate()
                .map_err(|e| format!("limiter `{name}` invalid: {e}"))?;
        }
        for (name, scheduler) in &self.schedulers {
            scheduler
                .validate()
                .map_err(|e| format!("scheduler `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse admission configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: ThrottleConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
