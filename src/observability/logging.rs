//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//! Secret values never reach a log line; secret names do.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::SeederConfig;
use crate::errors::{Result, SeederError};

/// Create a tracing span for one secret-store call.
///
/// ```rust,ignore
/// let span = store_span!("create_secret", "omix3-test-fence");
/// ```
#[macro_export]
macro_rules! store_span {
    ($operation:expr, $secret:expr) => {
        tracing::debug_span!("store_operation", operation = %$operation, secret = %$secret)
    };
    ($operation:expr, $secret:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "store_operation",
            operation = %$operation,
            secret = %$secret,
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Installing twice is not an
/// error; the first subscriber stays (integration tests rely on this).
pub fn init_logging(config: &SeederConfig) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.log_level),
    }
    .map_err(|e| SeederError::config(format!("Invalid log filter: {}", e)))?;

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false);

    // Already-set subscriber is fine
    let _ = if config.log_json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &SeederConfig) {
    tracing::info!(
        region = ?config.region,
        endpoint_override = config.secrets_endpoint.is_some(),
        call_timeout_secs = config.call_timeout_secs,
        strict_tagging = config.strict_tagging,
        "Secret seeder configuration"
    );
}
