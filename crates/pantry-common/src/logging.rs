//! Tracing subscriber setup shared by the Pantry binaries
//!
//! Events go to stdout, to a daily-rotated file, or to both. Library code
//! never prints; progress, skipped records and retry attempts are emitted as
//! structured `tracing` events and this module decides where they end up.
//!
//! ```no_run
//! use pantry_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::new(LogLevel::Info).file_prefix("pantry").merge_env()?;
//!     // Dropping the guard flushes buffered file output
//!     let _guard = init_logging(&config)?;
//!     tracing::info!(processed = 10_000u64, "Extraction progress");
//!     Ok(())
//! }
//! ```

use crate::error::{PantryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type SinkLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static>;

/// Minimum severity that is logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self> {
        const NAMES: [(&str, LogLevel); 5] = [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ];
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|&(_, level)| level)
            .ok_or_else(|| PantryError::config(format!("Unknown log level: {}", s)))
    }
}

/// Logging settings for one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable text
    pub json: bool,

    /// Write to stdout
    pub console: bool,

    /// Directory for rotated log files; file logging is off when unset
    pub file_dir: Option<PathBuf>,

    /// File name prefix, `pantry` gives `pantry.2026-10-14`
    pub file_prefix: String,

    /// Extra `EnvFilter` directives such as `reqwest=warn`
    pub directives: Vec<String>,

    /// Attach source file and line to every event
    pub location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LogLevel::default())
    }
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            json: false,
            console: true,
            file_dir: None,
            file_prefix: "pantry".to_string(),
            directives: Vec::new(),
            location: false,
        }
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Also log to daily files under `dir`
    pub fn to_file(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_dir = Some(dir.into());
        self
    }

    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Apply `PANTRY_LOG_*` environment overrides
    ///
    /// | Variable               | Effect                                   |
    /// |------------------------|------------------------------------------|
    /// | `PANTRY_LOG_LEVEL`     | minimum level                            |
    /// | `PANTRY_LOG_FORMAT`    | `text` or `json`                         |
    /// | `PANTRY_LOG_DIR`       | enable file output in this directory     |
    /// | `PANTRY_LOG_CONSOLE`   | `false` silences stdout                  |
    /// | `PANTRY_LOG_FILTER`    | comma-separated directives               |
    /// | `PANTRY_LOG_LOCATION`  | `true` adds file and line                |
    pub fn merge_env(self) -> Result<Self> {
        self.merge_lookup(|name| std::env::var(name).ok())
    }

    pub fn merge_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = lookup("PANTRY_LOG_LEVEL") {
            self.level = level.parse()?;
        }
        if let Some(format) = lookup("PANTRY_LOG_FORMAT") {
            self.json = match format.trim().to_ascii_lowercase().as_str() {
                "json" => true,
                "text" => false,
                other => return Err(PantryError::config(format!("Unknown log format: {}", other))),
            };
        }
        if let Some(dir) = lookup("PANTRY_LOG_DIR") {
            self.file_dir = Some(PathBuf::from(dir));
        }
        if let Some(console) = lookup("PANTRY_LOG_CONSOLE") {
            self.console = flag("PANTRY_LOG_CONSOLE", &console)?;
        }
        if let Some(filter) = lookup("PANTRY_LOG_FILTER") {
            self.directives
                .extend(filter.split(',').map(str::trim).filter(|d| !d.is_empty()).map(String::from));
        }
        if let Some(location) = lookup("PANTRY_LOG_LOCATION") {
            self.location = flag("PANTRY_LOG_LOCATION", &location)?;
        }
        Ok(self)
    }

    fn filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::from_default_env().add_directive(Level::from(self.level).into());
        self.directives.iter().try_fold(base, |filter, directive| {
            directive
                .parse::<Directive>()
                .map(|d| filter.add_directive(d))
                .map_err(|e| PantryError::config(format!("Bad filter directive '{}': {}", directive, e)))
        })
    }

    fn sink<W>(&self, writer: W, ansi: bool) -> SinkLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.location)
            .with_line_number(self.location)
            .with_span_events(FmtSpan::CLOSE);

        if self.json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }
}

fn flag(name: &str, value: &str) -> Result<bool> {
    value
        .trim()
        .parse()
        .map_err(|_| PantryError::config(format!("{} must be true or false, got {}", name, value)))
}

/// Install the global subscriber
///
/// The returned guard is `Some` when file output is enabled and must be held
/// until exit.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    use anyhow::Context;

    let mut sinks: Vec<SinkLayer> = Vec::new();
    if config.console {
        sinks.push(config.sink(std::io::stdout, true));
    }

    let guard = match &config.file_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, &config.file_prefix));
            sinks.push(config.sink(writer, false));
            Some(guard)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(sinks)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}
