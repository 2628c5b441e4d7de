//! Explicit logging handle passed to components at construction time.
//!
//! A [`Logger`] carries key/value fields (service, module, request id) and
//! forwards rendered records to a [`LogSink`]. The call site of every record
//! is captured with `#[track_caller]` and attached as `caller=file:line`.

use std::fmt::{self, Display};
use std::panic::Location;
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_FIELD_CHARS: usize = 512;

/// A single structured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: log::Level,
    pub event: String,
    pub fields: Vec<(String, String)>,
    pub caller: String,
}

impl LogRecord {
    /// Returns the value of the first field named `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event={}", self.event)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        write!(f, " caller={}", self.caller)
    }
}

/// Destination for records emitted through a [`Logger`].
pub trait LogSink: Send + Sync {
    fn write(&self, record: LogRecord);
}

/// Forwards records to the process-wide `log` facade.
struct FacadeSink;

impl LogSink for FacadeSink {
    fn write(&self, record: LogRecord) {
        log::log!(record.level, "{record}");
    }
}

/// Keeps records in memory so they can be inspected afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of every record written so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// Cloneable logging handle carrying contextual fields.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    fields: Vec<(String, String)>,
}

impl Logger {
    /// Builds a handle writing to `sink`.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            fields: Vec::new(),
        }
    }

    /// Builds a handle writing to the `log` facade.
    pub fn facade() -> Self {
        Self::new(Arc::new(FacadeSink))
    }

    /// Returns a child handle with one more field attached to every record.
    pub fn with(&self, key: &str, value: impl Display) -> Self {
        let mut child = self.clone();
        child.fields.push((key.to_string(), render(&value)));
        child
    }

    #[track_caller]
    pub fn error(&self, event: &str, fields: &[(&str, &dyn Display)]) {
        self.emit(log::Level::Error, event, fields, Location::caller());
    }

    #[track_caller]
    pub fn warn(&self, event: &str, fields: &[(&str, &dyn Display)]) {
        self.emit(log::Level::Warn, event, fields, Location::caller());
    }

    #[track_caller]
    pub fn info(&self, event: &str, fields: &[(&str, &dyn Display)]) {
        self.emit(log::Level::Info, event, fields, Location::caller());
    }

    fn emit(
        &self,
        level: log::Level,
        event: &str,
        fields: &[(&str, &dyn Display)],
        location: &Location<'_>,
    ) {
        let mut all = self.fields.clone();
        all.extend(
            fields
                .iter()
                .map(|(key, value)| ((*key).to_string(), render(value))),
        );

        self.sink.write(LogRecord {
            level,
            event: event.to_string(),
            fields: all,
            caller: caller_label(location),
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::facade()
    }
}

fn render(value: &dyn Display) -> String {
    super::one_line(&value.to_string(), MAX_FIELD_CHARS)
}

fn caller_label(location: &Location<'_>) -> String {
    let file = Path::new(location.file())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown");
    format!("{file}:{}", location.line())
}

#[cfg(test)]
mod tests {
    use super::{Logger, MemorySink};

    #[test]
    fn records_carry_handle_fields_and_call_site() {
        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone()).with("service", "notes");

        let line = line!() + 1;
        logger.with("request_id", "r-1").error("request_failed", &[("error", &"boom")]);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.level, log::Level::Error);
        assert_eq!(record.event, "request_failed");
        assert_eq!(record.field("service"), Some("notes"));
        assert_eq!(record.field("request_id"), Some("r-1"));
        assert_eq!(record.field("error"), Some("boom"));
        assert_eq!(record.caller, format!("handle.rs:{line}"));
    }

    #[test]
    fn child_fields_do_not_leak_into_parent() {
        let sink = MemorySink::new();
        let parent = Logger::new(sink.clone());
        let _child = parent.with("request_id", "r-2");

        parent.info("tick", &[]);
        assert_eq!(sink.records()[0].field("request_id"), None);
    }

    #[test]
    fn rendered_record_is_single_line() {
        let sink = MemorySink::new();
        Logger::new(sink.clone()).warn("odd", &[("detail", &"a\nb")]);

        let rendered = sink.records()[0].to_string();
        assert!(rendered.starts_with("event=odd detail=a b caller=handle.rs:"));
    }
}
