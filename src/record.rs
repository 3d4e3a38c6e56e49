use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Mutex;

use chrono::{DateTime, Local, Utc};

use crate::config;

/// Represents the severity level of a log record.
///
/// Levels are totally ordered, from `Trace` (lowest) to `Critical`
/// (highest), so they can be compared for filtering purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Very fine-grained messages used to trace control flow.
    Trace,
    /// Detailed messages useful for debugging.
    Debug,
    /// Informational messages about normal operation.
    Info,
    /// A potential issue or unexpected situation.
    Warn,
    /// A significant error that affects functionality.
    Error,
    /// An error severe enough that the application cannot continue.
    Critical,
}

impl Display for Severity {
    /// Formats the `Severity` level with a text label for display.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Trace => write!(f, "[TRACE]"),
            Severity::Debug => write!(f, "[DEBUG]"),
            Severity::Info => write!(f, "[INFO]"),
            Severity::Warn => write!(f, "[WARN]"),
            Severity::Error => write!(f, "[ERROR]"),
            Severity::Critical => write!(f, "[CRITICAL]"),
        }
    }
}

/// The transport-safe form of one emitted log event.
///
/// This is the value that crosses the aggregation channel: plain owned
/// data, serializable, with the message text already fully rendered at
/// emission time. It is never re-rendered downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// The severity level of the event.
    pub level: Severity,
    /// Emission instant, microseconds since the Unix epoch.
    pub unix_micros: i64,
    /// Identifier of the emitting logger or component.
    pub source: String,
    /// The rendered message text.
    pub content: String,
}

impl LogEvent {
    /// Creates a new `LogEvent` stamped with the current instant.
    pub fn new(level: Severity, source: impl Into<String>, content: impl Into<String>) -> Self {
        LogEvent {
            level,
            unix_micros: Utc::now().timestamp_micros(),
            source: source.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
struct RenderCache {
    pattern: Option<String>,
    rendered: String,
    renders: u32,
}

/// A log timestamp with cached display formatting.
///
/// Formatting is keyed by pattern identity: as long as the requested
/// pattern matches the one used for the cached string, the cached string
/// is returned without recomputation. A live change of the display
/// pattern invalidates the cache on the next read.
#[derive(Debug)]
pub struct TimeStamp {
    instant: DateTime<Local>,
    cache: Mutex<RenderCache>,
}

impl TimeStamp {
    /// Creates a `TimeStamp` from microseconds since the Unix epoch.
    ///
    /// Out-of-range values fall back to the epoch itself.
    pub fn from_unix_micros(unix_micros: i64) -> Self {
        let instant = DateTime::<Utc>::from_timestamp_micros(unix_micros)
            .unwrap_or_default()
            .with_timezone(&Local);
        TimeStamp {
            instant,
            cache: Mutex::new(RenderCache::default()),
        }
    }

    /// Formats the instant against `pattern`, reusing the cached string
    /// when the pattern has not changed since the last call.
    pub fn format(&self, pattern: &str) -> String {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.pattern.as_deref() != Some(pattern) {
            cache.rendered = self.instant.format(pattern).to_string();
            cache.pattern = Some(pattern.to_owned());
            cache.renders += 1;
        }
        cache.rendered.clone()
    }

    /// Formats the instant against the globally configured display pattern.
    pub fn display(&self) -> String {
        self.format(&config::timestamp_format())
    }
}

/// One aggregated log record, immutable once constructed.
///
/// The only mutable state is the timestamp's render cache, which is
/// derived and recomputable at any time.
#[derive(Debug)]
pub struct LogRecord {
    /// The severity level of the record.
    pub level: Severity,
    /// The emission instant, with cached display formatting.
    pub timestamp: TimeStamp,
    /// Identifier of the emitting logger or component.
    pub source: String,
    /// The rendered message text.
    pub content: String,
}

impl From<LogEvent> for LogRecord {
    fn from(event: LogEvent) -> Self {
        LogRecord {
            level: event.level,
            timestamp: TimeStamp::from_unix_micros(event.unix_micros),
            source: event.source,
            content: event.content,
        }
    }
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.timestamp.display(),
            self.level,
            self.source,
            self.content
        )
    }
}
