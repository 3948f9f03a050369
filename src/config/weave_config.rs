//! TaskWeave configuration
//!
//! Registry of configured provider instances. An organization may connect
//! several instances of the same provider kind (e.g., two Jira sites), each
//! with its own secrets and rate-limit overrides.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::presets::{default_presets, rate_limit_for, RateLimitConfig};
use crate::Result;

fn default_enabled() -> bool {
    true
}

/// A single configured provider instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Instance name (e.g., "acme-jira")
    pub name: String,

    /// Provider kind (e.g., "jira", "linear")
    pub provider: String,

    /// Whether this instance participates in sync
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Environment variable holding the webhook signing secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_env: Option<String>,

    /// Rate-limit override; falls back to the provider-kind preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    /// Provider-specific settings (workspace ids, base URLs, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub settings: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create a provider instance config
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            enabled: true,
            secret_env: None,
            rate_limit: None,
            settings: HashMap::new(),
        }
    }
}

/// Top-level TaskWeave configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaveConfig {
    /// Configured provider instances
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl WeaveConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider instance
    pub fn add_provider(&mut self, provider: ProviderConfig) {
        self.providers.push(provider);
    }

    /// Look up a provider instance by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Remove a provider instance by name, returning it if present
    pub fn remove_provider(&mut self, name: &str) -> Option<ProviderConfig> {
        let idx = self.providers.iter().position(|p| p.name == name)?;
        Some(self.providers.remove(idx))
    }

    /// Resolve the effective rate-limit config for a provider instance
    ///
    /// Instance override wins; otherwise the provider-kind preset applies.
    /// Unknown instance or provider kind is a configuration error.
    pub fn rate_limit_for(&self, name: &str) -> Result<RateLimitConfig> {
        let provider = self.get_provider(name).ok_or_else(|| {
            crate::TaskWeaveError::Config(format!("Unknown provider instance: {}", name))
        })?;
        if let Some(ref config) = provider.rate_limit {
            return Ok(config.clone());
        }
        rate_limit_for(&provider.provider, &default_presets())
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WeaveConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weave.yaml");

        let mut config = WeaveConfig::new();
        config.add_provider(ProviderConfig::new("acme-jira", "jira"));
        config.add_provider(ProviderConfig::new("acme-linear", "linear"));
        config.save(&path).unwrap();

        let loaded = WeaveConfig::load(&path).unwrap();
        assert_eq!(loaded.providers.len(), 2);
        assert!(loaded.get_provider("acme-jira").is_some());
        assert!(loaded.get_provider("nonexistent").is_none());
    }

    #[test]
    fn test_rate_limit_falls_back_to_preset() {
        let mut config = WeaveConfig::new();
        config.add_provider(ProviderConfig::new("acme-trello", "trello"));

        let limit = config.rate_limit_for("acme-trello").unwrap();
        assert_eq!(limit.max_requests, 300);
        assert_eq!(limit.window(), Duration::from_secs(10));
    }

    #[test]
    fn test_rate_limit_instance_override_wins() {
        let mut provider = ProviderConfig::new("slow-jira", "jira");
        provider.rate_limit = Some(RateLimitConfig::new(10, Duration::from_secs(60)));

        let mut config = WeaveConfig::new();
        config.add_provider(provider);

        let limit = config.rate_limit_for("slow-jira").unwrap();
        assert_eq!(limit.max_requests, 10);
    }

    #[test]
    fn test_unknown_instance_is_error() {
        let config = WeaveConfig::new();
        assert!(config.rate_limit_for("missing").is_err());
    }

    #[test]
    fn test_remove_provider() {
        let mut config = WeaveConfig::new();
        config.add_provider(ProviderConfig::new("a", "jira"));
        config.add_provider(ProviderConfig::new("b", "github"));

        assert!(config.remove_provider("a").is_some());
        assert_eq!(config.providers.len(), 1);
        assert!(config.get_provider("a").is_none());
    }
}
