//! Logging configuration using tracing
//!
//! Provides structured logging to stderr with support for the RUST_LOG
//! environment variable. Provider adapters and the webhook dispatcher emit
//! structured events through the `tracing` macros.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Sets up structured logging with:
/// - Filtering via RUST_LOG environment variable (defaults to "warn")
/// - Formatted output to stderr
///
/// # Example RUST_LOG values
/// - `RUST_LOG=info` - Show info and above
/// - `RUST_LOG=taskweave=debug` - Debug level for the taskweave crate
/// - `RUST_LOG=taskweave::webhook=trace` - Trace webhook dispatch only
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init() -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .pretty(),
        )
        .try_init()
        .map_err(|e| crate::TaskWeaveError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_helper() {
        // Should never panic, even when called repeatedly
        init_test();
        init_test();
    }

    #[test]
    fn test_logging_macros() {
        init_test();

        tracing::debug!("debug message");
        tracing::info!(provider = "jira", action = "sync", "structured fields");
        tracing::warn!("warning message");
    }
}
