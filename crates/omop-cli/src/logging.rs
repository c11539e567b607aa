//! Logging setup for the `omop` binary.
//!
//! Library crates only emit `tracing` events; this module installs the
//! subscriber. Source values (codes, dates) are logged under the
//! `omop::data` target, which stays off unless `--log-data` is given.
//!
//! # Log Levels
//!
//! - `error`: failed tables
//! - `warn`: aborted transformers, skipped checks
//! - `info`: waves, emitted tables, written files
//! - `debug`: per-stage row counts, repairs
//! - `trace`: nothing yet

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Target carrying row-level values.
pub const DATA_TARGET: &str = "omop::data";

const CRATES: [&str; 7] = [
    "omop_cli",
    "omop_core",
    "omop_ingest",
    "omop_model",
    "omop_report",
    "omop_transform",
    "omop_vocab",
];

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// Honor `RUST_LOG` when set. Explicit CLI flags turn this off.
    pub use_env_filter: bool,
    pub with_target: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Write to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Let the `omop::data` target through.
    pub log_data: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_target: false,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
            log_data: false,
        }
    }
}

/// Install the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        init_logging_with_writer(config, SharedFileWriter::new(file));
    } else {
        init_logging_with_writer(config, io::stderr);
    }
    Ok(())
}

pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = build_env_filter(config);
    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(config.with_target);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .without_time();
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .without_time();
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }
}

/// Filter directives for the configured level.
///
/// `RUST_LOG` wins when allowed and set; the data target is switched off
/// either way unless row-level logging was requested.
pub fn filter_directives(config: &LogConfig) -> String {
    let level = config.level_filter.to_string().to_lowercase();
    let mut directives = vec![LevelFilter::WARN.to_string().to_lowercase()];
    directives.extend(CRATES.iter().map(|name| format!("{name}={level}")));
    let data_level = if config.log_data { level.as_str() } else { "off" };
    directives.push(format!("{DATA_TARGET}={data_level}"));
    directives.join(",")
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let data_off = format!("{DATA_TARGET}=off");
    if config.use_env_filter
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        if config.log_data {
            return filter;
        }
        return match data_off.parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        };
    }
    EnvFilter::new(filter_directives(config))
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl SharedFileWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_target_is_off_by_default() {
        let config = LogConfig {
            level_filter: LevelFilter::DEBUG,
            ..LogConfig::default()
        };
        let directives = filter_directives(&config);
        assert!(directives.starts_with("warn,omop_cli=debug,"));
        assert!(directives.ends_with("omop::data=off"));
    }

    #[test]
    fn log_data_follows_the_level() {
        let config = LogConfig {
            level_filter: LevelFilter::INFO,
            log_data: true,
            ..LogConfig::default()
        };
        assert!(filter_directives(&config).ends_with("omop::data=info"));
    }
}
