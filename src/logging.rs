//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and to JSON log files
//! under `log/`.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// `RUST_LOG` overrides the environment's default level. Safe to call more
/// than once; only the first call installs the subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_dir = PathBuf::from("log");

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level.clone()));

        // Console-only when the log directory cannot be created
        let file_layer = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the writer alive for the life of the process
                std::mem::forget(guard);
                Some(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(EnvFilter::new(log_level)),
                )
            }
            Err(_) => None,
        };

        let file_enabled = file_layer.is_some();
        if tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_enabled,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Current environment from `NODE_INDEX_ENV` or `APP_ENV`
pub fn get_environment() -> String {
    std::env::var("NODE_INDEX_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Default log level for an environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for node lifecycle operations
pub fn log_node_operation(operation: &str, node_id: &str, status: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        node_id = %node_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 NODE_OPERATION"
    );
}

/// Log structured data for consumed events
pub fn log_event_operation(
    subject: &str,
    message_id: i64,
    read_count: i32,
    profile_url: Option<&str>,
) {
    tracing::info!(
        subject = %subject,
        message_id = message_id,
        read_count = read_count,
        profile_url = profile_url,
        timestamp = %Utc::now().to_rfc3339(),
        "📨 EVENT_OPERATION"
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
