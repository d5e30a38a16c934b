//! Worker configuration
//!
//! Thread count, superstep cap and transport timeout for a [`Worker`](super::worker::Worker).
//! Loadable from JSON or from `BSP_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::error::BspError;

/// What the worker does when `max_supersteps` is reached before convergence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitAction {
    /// Log a warning and stop, reporting the run as not converged
    #[default]
    Warn,
    /// Fail the computation with `SuperstepLimitExceeded`
    Abort,
}

impl std::str::FromStr for LimitAction {
    type Err = BspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(LimitAction::Warn),
            "abort" => Ok(LimitAction::Abort),
            other => Err(BspError::config(format!(
                "unknown limit action '{}', expected 'warn' or 'abort'",
                other
            ))),
        }
    }
}

/// Per-worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Threads in the intra-fragment pool
    pub thread_num: usize,

    /// Maximum incremental supersteps (`None` = unbounded)
    pub max_supersteps: Option<usize>,

    /// Action taken when `max_supersteps` is hit
    pub limit_action: LimitAction,

    /// Timeout for a single transport exchange or vote
    #[serde(with = "humantime_serde")]
    pub exchange_timeout: Duration,

    /// Record per-phase timings in the run summary
    pub profiling: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_num: num_cpus::get(),
            max_supersteps: None,
            limit_action: LimitAction::default(),
            exchange_timeout: Duration::from_secs(600), // 10 min per barrier
            profiling: false,
        }
    }
}

impl WorkerConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set thread count
    pub fn with_thread_num(mut self, thread_num: usize) -> Self {
        self.thread_num = thread_num.max(1);
        self
    }

    /// Set the superstep cap
    pub fn with_max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = Some(max);
        self
    }

    /// Set what happens when the cap is hit
    pub fn with_limit_action(mut self, action: LimitAction) -> Self {
        self.limit_action = action;
        self
    }

    /// Set the transport timeout
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    /// Enable or disable phase timings
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    /// Check if incremental superstep `superstep` (1-based) is past the cap
    pub fn exceeds_limit(&self, superstep: usize) -> bool {
        self.max_supersteps.is_some_and(|max| superstep > max)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), BspError> {
        if self.thread_num == 0 {
            return Err(BspError::config("thread_num must be at least 1"));
        }
        if self.exchange_timeout.is_zero() {
            return Err(BspError::config("exchange_timeout must be non-zero"));
        }
        Ok(())
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, BspError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BspError::config(format!("invalid worker config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment.
    ///
    /// A `.env` file is read if present. Recognised variables:
    /// `BSP_THREAD_NUM`, `BSP_MAX_SUPERSTEPS`, `BSP_LIMIT_ACTION`,
    /// `BSP_EXCHANGE_TIMEOUT` (humantime, e.g. `30s`), `BSP_PROFILING`.
    pub fn from_env() -> Result<Self, BspError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BspError> {
        let mut config = Self::default();

        if let Some(val) = lookup("BSP_THREAD_NUM") {
            config.thread_num = val
                .parse()
                .map_err(|_| BspError::config(format!("BSP_THREAD_NUM must be a positive integer, got '{}'", val)))?;
        }

        if let Some(val) = lookup("BSP_MAX_SUPERSTEPS") {
            config.max_supersteps = Some(val.parse().map_err(|_| {
                BspError::config(format!("BSP_MAX_SUPERSTEPS must be a positive integer, got '{}'", val))
            })?);
        }

        if let Some(val) = lookup("BSP_LIMIT_ACTION") {
            config.limit_action = val.parse()?;
        }

        if let Some(val) = lookup("BSP_EXCHANGE_TIMEOUT") {
            config.exchange_timeout = humantime_serde::re::humantime::parse_duration(&val)
                .map_err(|e| BspError::config(format!("BSP_EXCHANGE_TIMEOUT: {}", e)))?;
        }

        if let Some(val) = lookup("BSP_PROFILING") {
            config.profiling = matches!(val.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }
}
