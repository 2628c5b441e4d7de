//! Process logging backend and the injected logging handle.
//!
//! [`init_logging`] installs the `log` backend from a [`LogOptions`] value,
//! usually the `log_*` keys of the server configuration. Components never
//! talk to the backend directly; they receive a [`Logger`].
//!
//! # Invariants
//! - The backend is installed at most once per process.
//! - Repeating init with equal options is a no-op; different options are
//!   rejected with [`LoggingError::AlreadyActive`].

mod handle;

pub use handle::{LogRecord, LogSink, Logger, MemorySink};

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger as Backend,
    LoggerHandle, Naming, WriteMode,
};
use log::LevelFilter;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::any::Any;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "notes";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE: OnceCell<Active> = OnceCell::new();

struct Active {
    level: LevelFilter,
    dir: Option<PathBuf>,
    _handle: LoggerHandle,
}

/// Logging section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// `trace`, `debug`, `info`, `warn`, `error` or `off`.
    pub log_level: String,
    /// Absolute directory for rotated log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        let level = if cfg!(debug_assertions) {
            "debug"
        } else {
            "info"
        };
        Self {
            log_level: level.to_string(),
            log_dir: None,
        }
    }
}

impl LogOptions {
    fn level(&self) -> Result<LevelFilter, LoggingError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| LoggingError::UnknownLevel(self.log_level.clone()))
    }

    fn dir(&self) -> Result<Option<PathBuf>, LoggingError> {
        match &self.log_dir {
            Some(dir) if !dir.is_absolute() => Err(LoggingError::RelativeDir(dir.clone())),
            other => Ok(other.clone()),
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDir(PathBuf),
    CreateDir { dir: PathBuf, source: io::Error },
    Backend(FlexiLoggerError),
    AlreadyActive { active: String, requested: String },
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`; expected trace|debug|info|warn|error|off"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "logger backend failed to start: {err}"),
            Self::AlreadyActive { active, requested } => write!(
                f,
                "logging already active as {active}; refusing to switch to {requested}"
            ),
        }
    }
}

impl std::error::Error for LoggingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Installs the process logging backend described by `options`.
///
/// # Errors
/// Returns [`LoggingError`] when the options are invalid, the backend cannot
/// start, or a backend with different options is already installed.
pub fn init_logging(options: &LogOptions) -> Result<(), LoggingError> {
    let level = options.level()?;
    let dir = options.dir()?;

    let active = ACTIVE.get_or_try_init(|| start(level, dir.clone()))?;
    if active.level != level || active.dir != dir {
        return Err(LoggingError::AlreadyActive {
            active: describe(active.level, active.dir.as_deref()),
            requested: describe(level, dir.as_deref()),
        });
    }
    Ok(())
}

fn start(level: LevelFilter, dir: Option<PathBuf>) -> Result<Active, LoggingError> {
    let backend = Backend::with(LogSpecification::builder().default(level).build());
    let backend = match dir.as_deref() {
        Some(path) => {
            std::fs::create_dir_all(path).map_err(|source| LoggingError::CreateDir {
                dir: path.to_path_buf(),
                source,
            })?;
            backend
                .log_to_file(FileSpec::default().directory(path).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => backend
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
    };
    let handle = backend.start().map_err(LoggingError::Backend)?;

    log_panics();
    log::info!(
        "event=logging_init module=logging status=ok version={} {}",
        env!("CARGO_PKG_VERSION"),
        describe(level, dir.as_deref())
    );

    Ok(Active {
        level,
        dir,
        _handle: handle,
    })
}

/// Chains a hook that records panics as `event=panic` before the previous hook runs.
fn log_panics() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |at| format!("{}:{}", at.file(), at.line()));
        log::error!(
            "event=panic module=logging status=error location={location} payload={}",
            panic_text(info.payload())
        );
        previous(info);
    }));
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>");
    one_line(text, PANIC_PAYLOAD_CHARS)
}

fn describe(level: LevelFilter, dir: Option<&Path>) -> String {
    let target = dir.map_or_else(|| "stderr".to_string(), |dir| dir.display().to_string());
    format!("level={level} target={target}")
}

/// Flattens `value` onto one line and caps it at `max_chars` characters.
pub(crate) fn one_line(value: &str, max_chars: usize) -> String {
    let mut out: String = value
        .chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if value.chars().nth(max_chars).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{init_logging, one_line, panic_text, LogOptions, LoggingError};
    use log::LevelFilter;
    use std::path::PathBuf;

    #[test]
    fn options_deserialize_with_defaults() {
        let options: LogOptions = serde_json::from_str(r#"{"log_level":"WARN"}"#).unwrap();
        assert_eq!(options.level().unwrap(), LevelFilter::Warn);
        assert_eq!(options.log_dir, None);

        let defaults: LogOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, LogOptions::default());
    }

    #[test]
    fn unknown_level_and_relative_dir_are_rejected() {
        let verbose = LogOptions {
            log_level: "verbose".to_string(),
            log_dir: None,
        };
        assert!(matches!(verbose.level(), Err(LoggingError::UnknownLevel(_))));

        let relative = LogOptions {
            log_dir: Some(PathBuf::from("logs/dev")),
            ..LogOptions::default()
        };
        let err = relative.dir().unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn one_line_flattens_and_truncates() {
        let flattened = one_line("line1\nline2\rline3", 8);
        assert_eq!(flattened, "line1 li...");
        assert_eq!(one_line("short", 8), "short");
    }

    #[test]
    fn panic_text_reads_str_and_string_payloads() {
        assert_eq!(panic_text(&"boom"), "boom");
        assert_eq!(panic_text(&String::from("bang")), "bang");
        assert_eq!(panic_text(&42_u8), "<non-string payload>");
    }

    #[test]
    fn init_is_idempotent_and_rejects_other_options() {
        let dir = tempfile::tempdir().unwrap();
        let options = LogOptions {
            log_level: "info".to_string(),
            log_dir: Some(dir.path().to_path_buf()),
        };

        init_logging(&options).expect("first init should succeed");
        init_logging(&options).expect("same options should be a no-op");

        let louder = LogOptions {
            log_level: "debug".to_string(),
            ..options.clone()
        };
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::AlreadyActive { .. })
        ));

        let stderr = LogOptions {
            log_dir: None,
            ..options
        };
        let err = init_logging(&stderr).unwrap_err();
        assert!(err.to_string().contains("refusing to switch"));
    }
}
