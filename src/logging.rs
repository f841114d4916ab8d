//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files,
//! so cache flushes and store round trips can be followed after the fact.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Console output is human readable; the file in `log/` receives JSON lines.
/// When the log directory cannot be created only the console layer is installed.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(build_filter(&log_level));

        let log_dir = PathBuf::from("log");
        if let Err(e) = fs::create_dir_all(&log_dir) {
            try_install(tracing_subscriber::registry().with(console_layer));
            tracing::warn!(error = %e, "Log directory unavailable, logging to console only");
            return;
        }

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_path = log_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry().with(console_layer).with(
            fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(build_filter(&log_level)),
        );

        try_install(subscriber);

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_path.display(),
            "🔧 STRUCTURED LOGGING: Initialized with file output"
        );

        // Keep the writer alive for the life of the process
        std::mem::forget(guard);
    });
}

/// Install `subscriber` globally; `false` when the host already owns the global subscriber
fn try_install<S: SubscriberInitExt>(subscriber: S) -> bool {
    if subscriber.try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        return false;
    }
    true
}

/// `RUST_LOG` wins over the environment default
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var("PUNISHMENTS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for cache operations
pub fn log_cache_operation(
    operation: &str,
    cache: &str,
    ident: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        cache = %cache,
        ident = ident,
        status = %status,
        details = details,
        "🗃️ CACHE_OPERATION"
    );
}

/// Log structured data for backing-store round trips
pub fn log_store_operation(
    operation: &str,
    collection: &str,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        collection = %collection,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 STORE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_helpers_do_not_require_a_subscriber() {
        log_cache_operation("get", "reasons", Some("7"), "hit", None);
        log_store_operation("find_one", "punishment_reasons", "ok", Some(3), None);
        log_error("reason_store", "push", "boom", Some("test"));
    }

    #[test]
    fn test_second_install_reports_existing_subscriber() {
        try_install(tracing_subscriber::registry());
        assert!(!try_install(tracing_subscriber::registry()));
    }
}
