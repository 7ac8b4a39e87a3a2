//! Logging infrastructure for ragsync.
//!
//! The binary installs one tracing subscriber at startup. Library code never
//! touches global logging state; each sync or query invocation runs inside its
//! own span instead (see [`invocation_span`]).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Initialize the tracing subscriber with stderr output.
///
/// Stdout is reserved for JSON responses.
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "debug", "info")
/// * `no_color` - Disable colored output
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && std::env::var("NO_COLOR").is_err());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Create the span that scopes all log output of one invocation.
///
/// `operation` is "sync", "query" or "stats"; `invocation_id` correlates every
/// event the invocation emits.
pub fn invocation_span(operation: &'static str, invocation_id: &str) -> tracing::Span {
    tracing::info_span!("invocation", operation, id = %invocation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_rejected() {
        let result = init_logging(Some("ragsync=loud"), true);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_invocation_span_without_subscriber() {
        let span = invocation_span("sync", "abc");
        let _guard = span.enter();
        tracing::info!("inside span");
    }
}
