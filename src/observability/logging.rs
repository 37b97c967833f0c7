//! Structured logging.
//!
//! # Responsibilities
//! - Describe log level, encoding and destination in configuration
//! - Install the global `tracing` subscriber at startup
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - JSON format for machine parsing, console format for humans
//! - Destination `none` disables logging entirely
//! - A `?level=...&encoding=...` query on the destination overrides the
//!   top-level values for that output

use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log level {0:?}")]
    InvalidLevel(String),
    #[error("unknown log encoding {0:?}")]
    InvalidEncoding(String),
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEncoding {
    Console,
    Compact,
    Json,
}

impl FromStr for LogEncoding {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "console" | "mixed" => Ok(LogEncoding::Console),
            "compact" => Ok(LogEncoding::Compact),
            "json" => Ok(LogEncoding::Json),
            other => Err(LoggingError::InvalidEncoding(other.to_string())),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    pub level: String,
    /// console (alias mixed), compact or json.
    pub encoding: String,
    /// stderr, stdout, none, or a file path (appended to), optionally
    /// followed by `?level=<level>&encoding=<encoding>`.
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            encoding: "console".to_string(),
            file: "stderr".to_string(),
        }
    }
}

/// Settings for the single output after destination overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub level: tracing::Level,
    pub encoding: LogEncoding,
    /// Destination with the override query removed.
    pub target: String,
}

impl LoggingConfig {
    /// Validate level and encoding without installing anything.
    pub fn check(&self) -> Result<(tracing::Level, LogEncoding), LoggingError> {
        let out = self.resolve()?;
        Ok((out.level, out.encoding))
    }

    /// Apply the destination's query overrides to the top-level settings.
    pub fn resolve(&self) -> Result<ResolvedOutput, LoggingError> {
        let (target, query) = match self.file.split_once('?') {
            Some((target, query)) => (target, query),
            None => (self.file.as_str(), ""),
        };

        let mut level = self.level.clone();
        let mut encoding = self.encoding.clone();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "level" => level = value.into_owned(),
                "encoding" => encoding = value.into_owned(),
                other => tracing::debug!(key = %other, "Ignoring unknown log output option"),
            }
        }

        let level =
            tracing::Level::from_str(&level).map_err(|_| LoggingError::InvalidLevel(level))?;
        Ok(ResolvedOutput {
            level,
            encoding: encoding.parse()?,
            target: target.to_string(),
        })
    }

    pub fn is_disabled(&self) -> bool {
        let target = self.file.split_once('?').map_or(self.file.as_str(), |(t, _)| t);
        target.eq_ignore_ascii_case("none")
    }
}

fn writer(target: &str) -> Result<BoxMakeWriter, LoggingError> {
    Ok(match target {
        "" | "stderr" => BoxMakeWriter::new(std::io::stderr),
        "stdout" => BoxMakeWriter::new(std::io::stdout),
        path => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    })
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let out = config.resolve()?;
    if config.is_disabled() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(out.level.to_string().to_ascii_lowercase()));

    let fmt = tracing_subscriber::fmt::layer().with_writer(writer(&out.target)?);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match out.encoding {
        LogEncoding::Json => fmt.json().boxed(),
        LogEncoding::Compact => fmt.compact().boxed(),
        LogEncoding::Console => fmt.boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).try_init()?;
    Ok(())
}
