use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Keeps the log file writer alive. Hold it until exit, otherwise buffered
/// file output is lost.
pub struct LogGuard {
    _writer: WorkerGuard,
    installed: bool,
}

impl LogGuard {
    /// False when another global subscriber was already in place, in which
    /// case events keep going to that one and the log file stays empty.
    pub fn installed(&self) -> bool {
        self.installed
    }
}

/// Installs the global subscriber: `<log_dir>/<component>.log.<date>`, plus
/// stderr when `to_stderr` is set. `RUST_LOG` overrides the default `info`.
pub fn init_logging(log_dir: &Path, component: &str, to_stderr: bool) -> LogGuard {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Cannot create log directory {}: {}", log_dir.display(), e);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", component));
    let (non_blocking, writer) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let result = if to_stderr {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);
        registry.with(stderr_layer).try_init()
    } else {
        registry.try_init()
    };

    let installed = match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Logging for {} not installed, keeping the existing subscriber: {}",
                component,
                e
            );
            false
        }
    };

    LogGuard {
        _writer: writer,
        installed,
    }
}
