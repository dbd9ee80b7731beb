use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::events::{EngineError, EngineResult};

const TIMER_INTERVAL_SECS: &str = "EVENT_ENGINE_TIMER_INTERVAL_SECS";
const ENGINE_NAME: &str = "EVENT_ENGINE_NAME";

/// Interval used when a non-positive one is supplied.
pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration of an `EventEngine`.
///
/// The timer interval is always positive: zero or negative inputs are replaced
/// by [`DEFAULT_TIMER_INTERVAL`] instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time between two timer events
    pub timer_interval: Duration,
    /// Name attached to the engine's log lines
    pub name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timer_interval: DEFAULT_TIMER_INTERVAL,
            name: "event-engine".to_string(),
        }
    }
}

impl EngineConfig {
    /// Sets the timer interval, clamping zero to the default.
    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = clamp_interval(interval);
        self
    }

    /// Sets the timer interval in whole seconds, clamping non-positive values
    /// to the default.
    pub fn with_timer_interval_secs(self, secs: i64) -> Self {
        self.with_timer_interval(interval_from_secs(secs))
    }

    /// Sets the name used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns a copy whose interval is guaranteed positive.
    pub fn normalized(mut self) -> Self {
        self.timer_interval = clamp_interval(self.timer_interval);
        self
    }

    /// Loads the configuration from the environment, reading `.env` first.
    ///
    /// Unset variables keep their default values.
    pub fn try_from_env() -> EngineResult<EngineConfig> {
        // Load .env file
        dotenv().ok();
        Self::try_from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn try_from_vars<F>(lookup: F) -> EngineResult<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        if let Some(raw) = lookup(TIMER_INTERVAL_SECS) {
            let secs = raw.trim().parse::<i64>().map_err(|_| {
                EngineError::Config(format!(
                    "failed to parse environment variable {}: {}",
                    TIMER_INTERVAL_SECS, raw
                ))
            })?;
            config = config.with_timer_interval_secs(secs);
        }

        if let Some(name) = lookup(ENGINE_NAME) {
            config.name = name.trim().to_string();
        }

        info!(
            "Loaded engine config: name={}, timer_interval={:?}",
            config.name, config.timer_interval
        );
        Ok(config)
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        warn!(
            "Timer interval must be positive, using default of {:?}",
            DEFAULT_TIMER_INTERVAL
        );
        DEFAULT_TIMER_INTERVAL
    } else {
        interval
    }
}

fn interval_from_secs(secs: i64) -> Duration {
    u64::try_from(secs).map_or(Duration::ZERO, Duration::from_secs)
}
