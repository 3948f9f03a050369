//! Per-provider rate-limit presets
//!
//! Published API quotas for the supported providers, expressed as
//! token-bucket parameters. Presets are an explicit map built at runtime
//! (not static state) so multiple limiter fleets with different tables can
//! coexist in one process.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, TaskWeaveError};

fn default_queue_enabled() -> bool {
    true
}

fn default_max_queue_size() -> usize {
    100
}

/// Token-bucket parameters for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u32,

    /// Refill window in milliseconds
    pub window_ms: u64,

    /// Bucket capacity (bursts above the sustained rate)
    pub burst_size: u32,

    /// Queue callers when the bucket is empty instead of rejecting
    #[serde(default = "default_queue_enabled")]
    pub queue_enabled: bool,

    /// Maximum number of queued callers before rejecting with queue-full
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

impl RateLimitConfig {
    /// Create a config with burst capacity equal to the sustained rate
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis() as u64,
            burst_size: max_requests,
            queue_enabled: true,
            max_queue_size: default_max_queue_size(),
        }
    }

    /// Override the bucket capacity
    pub fn with_burst(mut self, burst_size: u32) -> Self {
        self.burst_size = burst_size;
        self
    }

    /// Disable queuing; callers are rejected as soon as the bucket is empty
    pub fn without_queue(mut self) -> Self {
        self.queue_enabled = false;
        self
    }

    /// Refill window as a [`Duration`]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Build the default preset table for the known providers
///
/// Values follow each provider's published quota. Callers may extend or
/// replace entries before handing the table to
/// [`rate_limit_for`].
pub fn default_presets() -> HashMap<String, RateLimitConfig> {
    let mut presets = HashMap::new();
    presets.insert(
        "jira".to_string(),
        RateLimitConfig::new(100, Duration::from_secs(60)),
    );
    presets.insert(
        "github".to_string(),
        RateLimitConfig::new(5000, Duration::from_secs(3600)).with_burst(100),
    );
    presets.insert(
        "asana".to_string(),
        RateLimitConfig::new(1500, Duration::from_secs(60)).with_burst(150),
    );
    presets.insert(
        "linear".to_string(),
        RateLimitConfig::new(1500, Duration::from_secs(3600)).with_burst(50),
    );
    presets.insert(
        "trello".to_string(),
        RateLimitConfig::new(300, Duration::from_secs(10)),
    );
    presets.insert(
        "clickup".to_string(),
        RateLimitConfig::new(100, Duration::from_secs(60)),
    );
    presets.insert(
        "monday".to_string(),
        RateLimitConfig::new(5000, Duration::from_secs(60)).with_burst(500),
    );
    presets
}

/// Look up the preset for a provider
///
/// An unknown provider name is a configuration error, not a silent default.
pub fn rate_limit_for(
    provider: &str,
    presets: &HashMap<String, RateLimitConfig>,
) -> Result<RateLimitConfig> {
    presets
        .get(provider)
        .cloned()
        .ok_or_else(|| TaskWeaveError::Config(format!("No rate-limit preset for provider: {}", provider)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_provider_preset() {
        let presets = default_presets();
        let config = rate_limit_for("jira", &presets).unwrap();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(config.burst_size, 100);
        assert!(config.queue_enabled);
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let presets = default_presets();
        let err = rate_limit_for("basecamp", &presets).unwrap_err();
        assert!(matches!(err, TaskWeaveError::Config(_)));
        assert!(err.to_string().contains("basecamp"));
    }

    #[test]
    fn test_burst_override() {
        let presets = default_presets();
        let github = rate_limit_for("github", &presets).unwrap();
        assert_eq!(github.burst_size, 100);
        assert!(github.burst_size < github.max_requests);
    }

    #[test]
    fn test_without_queue() {
        let config = RateLimitConfig::new(10, Duration::from_secs(1)).without_queue();
        assert!(!config.queue_enabled);
    }
}
