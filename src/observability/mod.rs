//! Observability: structured logging through `tracing`.
//!
//! Metrics are emitted through the `metrics` facade by the services
//! themselves; no exporter is installed here, so they cost nothing unless
//! an embedding application installs a recorder.

mod logging;

pub use logging::{LogFormat, LoggingConfig};

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

/// Options for environment-based initialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Whether verbose output was requested via CLI.
    pub verbose: bool,
}

static LOGGING_INSTALLED: OnceLock<()> = OnceLock::new();

/// Initializes logging using environment variables.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log
/// file cannot be opened.
pub fn init_from_env(options: InitOptions) -> Result<()> {
    init(LoggingConfig::from_env(options.verbose))
}

/// Installs the global subscriber.
///
/// Pretty output goes to stderr with colors, or to the log file without;
/// JSON output carries the current span and its parents on every line.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log
/// file cannot be opened.
pub fn init(config: LoggingConfig) -> Result<()> {
    if LOGGING_INSTALLED.get().is_some() {
        return Err(init_failed("logging already initialized"));
    }

    let to_file = config.file.is_some();
    let writer = match &config.file {
        Some(path) => BoxMakeWriter::new(open_log_file(path)?),
        None => BoxMakeWriter::new(io::stderr),
    };
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty if to_file => fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(config.filter)
        .try_init()
        .map_err(init_failed)?;

    LOGGING_INSTALLED
        .set(())
        .map_err(|()| init_failed("logging initialized concurrently"))
}

fn init_failed(cause: impl ToString) -> Error {
    Error::OperationFailed {
        operation: "init_logging".to_string(),
        cause: cause.to_string(),
    }
}

/// Append-only log file shared by every writer the subscriber makes.
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<File>>);

impl SharedLogFile {
    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self.0.lock().map_err(|e| io::Error::other(e.to_string()))?;
        op(&mut file)
    }
}

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(File::flush)
    }
}

impl<'a> MakeWriter<'a> for SharedLogFile {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<SharedLogFile> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|file| SharedLogFile(Arc::new(Mutex::new(file))))
        .map_err(|e| Error::io(path, e))
}
