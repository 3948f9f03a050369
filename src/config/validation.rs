//! Configuration validation
//!
//! Validates TaskWeave configuration for correctness:
//! - No duplicate provider instance names
//! - Sane rate-limit parameters
//! - Secret environment variables named where webhooks are expected

use std::collections::HashSet;

use super::weave_config::WeaveConfig;
use crate::TaskWeaveError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub provider: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] {}: {}", provider, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a TaskWeave configuration
pub fn validate_config(config: &WeaveConfig) -> ValidationResult {
    let mut errors = Vec::new();

    // Check for duplicate instance names
    let mut seen_names = HashSet::new();
    for provider in &config.providers {
        if !seen_names.insert(&provider.name) {
            errors.push(ValidationError::new(
                "providers",
                format!("Duplicate provider instance name: {}", provider.name),
            ));
        }
    }

    for provider in &config.providers {
        if provider.name.is_empty() {
            errors.push(ValidationError::new("name", "Instance name must not be empty"));
        }
        if provider.provider.is_empty() {
            errors.push(
                ValidationError::new("provider", "Provider kind must not be empty")
                    .with_provider(&provider.name),
            );
        }
        if let Some(ref env) = provider.secret_env {
            if env.is_empty() {
                errors.push(
                    ValidationError::new("secret_env", "Secret env var name must not be empty")
                        .with_provider(&provider.name),
                );
            }
        }
        if let Some(ref limit) = provider.rate_limit {
            if limit.max_requests == 0 {
                errors.push(
                    ValidationError::new("rate_limit.max_requests", "Must be greater than 0")
                        .with_provider(&provider.name),
                );
            }
            if limit.window_ms == 0 {
                errors.push(
                    ValidationError::new("rate_limit.window_ms", "Must be greater than 0")
                        .with_provider(&provider.name),
                );
            }
            if limit.burst_size == 0 {
                errors.push(
                    ValidationError::new("rate_limit.burst_size", "Must be greater than 0")
                        .with_provider(&provider.name),
                );
            }
            if limit.queue_enabled && limit.max_queue_size == 0 {
                errors.push(
                    ValidationError::new(
                        "rate_limit.max_queue_size",
                        "Must be greater than 0 when queuing is enabled",
                    )
                    .with_provider(&provider.name),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert failures into a single configuration error
pub fn validate_config_result(config: &WeaveConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        TaskWeaveError::Config(format!(
            "Configuration validation failed:\n  {}",
            messages.join("\n  ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, RateLimitConfig};
    use std::time::Duration;

    #[test]
    fn test_valid_config_passes() {
        let mut config = WeaveConfig::new();
        config.add_provider(ProviderConfig::new("acme-jira", "jira"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = WeaveConfig::new();
        config.add_provider(ProviderConfig::new("dup", "jira"));
        config.add_provider(ProviderConfig::new("dup", "github"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("Duplicate")));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut provider = ProviderConfig::new("bad", "jira");
        let mut limit = RateLimitConfig::new(10, Duration::from_secs(1));
        limit.window_ms = 0;
        provider.rate_limit = Some(limit);

        let mut config = WeaveConfig::new();
        config.add_provider(provider);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "rate_limit.window_ms");
        assert_eq!(errors[0].provider.as_deref(), Some("bad"));
    }

    #[test]
    fn test_validate_config_result_flattens_errors() {
        let mut config = WeaveConfig::new();
        config.add_provider(ProviderConfig::new("", "jira"));

        let err = validate_config_result(&config).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }
}
