use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine policy knobs. Every threshold the matcher and training flow use
/// comes from here; the defaults are the shipped policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum overall score for a match to be acceptable.
    pub match_threshold: f64,
    /// How long a per-type cache entry stays valid without an invalidation.
    pub cache_ttl_secs: u64,
    /// Upper bound on a single action execution.
    pub execution_timeout_ms: u64,
    /// How many recent executions to retain per pattern for trend analysis.
    pub history_window: usize,
    /// Dead band around the lifetime success rate before a trend is called.
    pub trend_band: f64,
    /// Days before a never-used pattern counts as stale.
    pub stale_after_days: f64,
    /// Days before a never-used pattern is recommended for deletion.
    pub delete_after_days: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.6,
            cache_ttl_secs: 300,
            execution_timeout_ms: 10_000,
            history_window: 20,
            trend_band: 0.1,
            stale_after_days: 30.0,
            delete_after_days: 60.0,
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}
