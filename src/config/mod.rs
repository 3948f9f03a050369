//! Configuration system
//!
//! Provider instance registry and per-provider rate-limit presets.
//!
//! Loads a YAML config file with support for:
//! - Multiple instances of the same provider kind (e.g., two Jira sites)
//! - Per-instance rate-limit overrides on top of the published presets
//! - Webhook signing secrets referenced by environment variable name

mod presets;
pub mod validation;
mod weave_config;

pub use presets::{default_presets, rate_limit_for, RateLimitConfig};
pub use validation::{validate_config, validate_config_result, ValidationError};
pub use weave_config::{ProviderConfig, WeaveConfig};
