use std::sync::Once;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Environment variable enabling log output in tests.
const ENABLE_TEST_TRACING_ENV: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Flushes buffered log lines when dropped.
///
/// Keep it alive until the end of `main`, otherwise the last log lines may be lost.
#[must_use = "dropping the flusher stops log output"]
#[derive(Debug)]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global subscriber for the binary `app_name` with human readable output.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_format(app_name, LogFormat::Text)
}

/// Installs the global subscriber for the binary `app_name`.
///
/// Log lines go to stderr through a background writer so stdout stays free for the command
/// output. `RUST_LOG` overrides the default filter, which logs `info` and above for the binary
/// and the `keysplit` library.
pub fn init_tracing_with_format(
    app_name: &str,
    format: LogFormat,
) -> Result<LogFlusher, TracingError> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(app_name)));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(writer).with_target(false))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?,
    }

    Ok(LogFlusher { _guard: guard })
}

/// Installs a subscriber writing to the test harness output.
///
/// Does nothing unless `ENABLE_TRACING` is set, and only the first call has an effect.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var_os(ENABLE_TEST_TRACING_ENV).is_none() {
            return;
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("keysplit=debug"));

        // The test may have installed its own subscriber already.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

fn default_directives(app_name: &str) -> String {
    let app_target = app_name.replace('-', "_");
    if app_target == "keysplit" {
        return "keysplit=info".to_string();
    }

    format!("{app_target}=info,keysplit=info")
}
