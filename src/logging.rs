use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize structured logging.
///
/// Console output goes to stderr, as text or JSON depending on `format`. When
/// `log_file` is set, a daily-rolling JSON file layer is added; the returned
/// guard flushes it and must stay alive for as long as the process logs.
pub fn init_logging(log_level: &str, log_file: Option<&Path>, format: &str) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("Failed to create log filter")?;

    let console_layer = if format == "json" {
        fmt::layer().with_writer(std::io::stderr).with_target(true).json().boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .boxed()
    };

    let registry = Registry::default().with(env_filter).with(console_layer);

    let guard = if let Some(log_path) = log_file {
        let directory = log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let file_name = log_path
            .file_name()
            .map_or_else(|| "fitbit-scheduler.log".into(), |n| n.to_string_lossy().into_owned());

        let (writer, guard) = non_blocking(rolling::daily(directory, file_name));
        let file_layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true).json();

        registry.with(file_layer).try_init().context("Failed to install log subscriber")?;
        Some(guard)
    } else {
        registry.try_init().context("Failed to install log subscriber")?;
        None
    };

    info!("Logging system initialized");
    Ok(guard)
}

/// Logs how long an operation took when finished, or at debug level on drop
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
    finished: bool,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(mut self) -> Duration {
        self.finished = true;
        let duration = self.start.elapsed();
        info!(
            operation = self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.finished && !std::thread::panicking() {
            tracing::debug!(
                operation = self.operation,
                duration_ms = self.start.elapsed().as_millis() as u64,
                "Operation abandoned"
            );
        }
    }
}
