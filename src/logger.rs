use std::io::{self, Write as _};

use parking_lot::Mutex;

use crate::color::ColorScheme;
use crate::context::LogContext;
use crate::formatter::Formatter;
use crate::level::Level;
use crate::record::{FieldMap, Record};
use crate::sink::LogSink;
use crate::value::FieldValue;

/// Builder for the process-wide base [`LogContext`].
///
/// The builder seeds the base context's fields (typically `service` and
/// `version`), picks the output sink, and configures the formatter. `build`
/// consumes it and returns the immutable base context every request-scoped
/// context is derived from.
///
/// ```
/// use actix_request_log::{Level, Logger};
///
/// let log = Logger::builder()
///     .service("user-service")
///     .version("1.0.0")
///     .level(Level::Debug)
///     .build();
/// log.info("service started");
/// ```
pub struct Logger {
    formatter: Formatter,
    sink: Box<dyn LogSink>,
    min_level: Level,
    fields: FieldMap,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            formatter: Formatter::new(),
            sink: Box::new(io::stderr()),
            min_level: Level::Trace,
            fields: FieldMap::new(),
        }
    }
}

impl Logger {
    /// Creates a base context configured like the stock service logger:
    /// stderr sink, full wall-clock timestamps, and the given service
    /// identity.
    pub fn new(service: &str, version: &str, force_colors: bool) -> LogContext {
        Logger::builder()
            .service(service)
            .version(version)
            .force_colors(force_colors)
            .full_timestamp(true)
            .build()
    }

    /// Starts a builder with default options.
    pub fn builder() -> Logger {
        Logger::default()
    }

    /// Sets the `service` seed field.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.fields.insert("service", service.into());
        self
    }

    /// Sets the `version` seed field.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.fields.insert("version", version.into());
        self
    }

    /// Adds an arbitrary seed field to the base context.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key, value);
        self
    }

    /// Drops records below this level. Defaults to [`Level::Trace`].
    pub fn level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Replaces the output sink. Defaults to stderr.
    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Replaces the whole formatter.
    pub fn formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Uses the colored render mode regardless of the sink.
    pub fn force_colors(mut self, force: bool) -> Self {
        self.formatter.force_colors = force;
        self
    }

    /// Prints wall-clock timestamps in the colored mode.
    pub fn full_timestamp(mut self, full: bool) -> Self {
        self.formatter.full_timestamp = full;
        self
    }

    /// Sets the `chrono` format string for wall-clock timestamps.
    pub fn timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.formatter.timestamp_format = format.into();
        self
    }

    /// Sets the character wrapped around quoted values.
    pub fn quote_character(mut self, quote: char) -> Self {
        self.formatter.quote_character = quote;
        self
    }

    /// Keeps fields in insertion order instead of sorting by name.
    pub fn disable_sorting(mut self, disable: bool) -> Self {
        self.formatter.disable_sorting = disable;
        self
    }

    /// Leaves the timestamp out of every line.
    pub fn disable_timestamp(mut self, disable: bool) -> Self {
        self.formatter.disable_timestamp = disable;
        self
    }

    /// Keeps the level token lowercase in the colored mode.
    pub fn disable_uppercase(mut self, disable: bool) -> Self {
        self.formatter.disable_uppercase = disable;
        self
    }

    /// Quotes empty string values.
    pub fn quote_empty_fields(mut self, quote: bool) -> Self {
        self.formatter.quote_empty_fields = quote;
        self
    }

    /// Replaces the colored mode's color scheme.
    pub fn color_scheme(mut self, scheme: &ColorScheme) -> Self {
        self.formatter.set_color_scheme(scheme);
        self
    }

    /// Builds the immutable base context.
    pub fn build(self) -> LogContext {
        // The capability is sampled once; sinks do not change their nature
        // mid-run.
        let terminal = self.sink.is_terminal();
        LogContext::from_parts(
            LoggerCore {
                formatter: self.formatter,
                sink: Mutex::new(self.sink),
                terminal,
                min_level: self.min_level,
            },
            self.fields,
        )
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("formatter", &self.formatter)
            .field("min_level", &self.min_level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Shared emit machinery behind every context derived from one builder.
pub(crate) struct LoggerCore {
    formatter: Formatter,
    sink: Mutex<Box<dyn LogSink>>,
    terminal: bool,
    min_level: Level,
}

impl LoggerCore {
    pub(crate) fn log(&self, record: &Record) {
        if record.level < self.min_level {
            return;
        }
        let line = self.formatter.format(record, self.terminal);
        // Write failures are the sink's concern; the emitter never retries.
        let _ = self.sink.lock().write_all(&line);
    }
}
