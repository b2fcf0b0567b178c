use std::fmt::Write as _;
use std::time::Instant;

use crate::color::{ColorScheme, CompiledColorScheme, DEFAULT_COMPILED_SCHEME};
use crate::record::Record;
use crate::value::FieldValue;

/// Default wall-clock timestamp format, a `chrono` format string.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders log records into single text lines.
///
/// Rendering is infallible and deterministic: for a fixed record and fixed
/// options the output bytes are identical on every call. Two modes exist.
/// The plain mode emits machine-parsable `key:value` pairs; the colored mode
/// emits a human-oriented line with ANSI styling. The colored mode is chosen
/// when colors are forced or the destination sink reports an interactive
/// terminal.
#[derive(Debug)]
pub struct Formatter {
    /// Use the colored mode even when the sink is not a terminal.
    pub force_colors: bool,
    /// In colored mode, print a wall-clock timestamp instead of the
    /// milliseconds elapsed since the formatter was created.
    pub full_timestamp: bool,
    /// Leave the timestamp out entirely.
    pub disable_timestamp: bool,
    /// Keep fields in insertion order instead of sorting them by name.
    pub disable_sorting: bool,
    /// Keep the level token lowercase in colored mode.
    pub disable_uppercase: bool,
    /// Quote empty string values.
    pub quote_empty_fields: bool,
    /// `chrono` format string for wall-clock timestamps.
    pub timestamp_format: String,
    /// Character wrapped around quoted values.
    pub quote_character: char,
    colors: CompiledColorScheme,
    epoch: Instant,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            force_colors: false,
            full_timestamp: false,
            disable_timestamp: false,
            disable_sorting: false,
            disable_uppercase: false,
            quote_empty_fields: false,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
            quote_character: '"',
            colors: *DEFAULT_COMPILED_SCHEME,
            epoch: Instant::now(),
        }
    }
}

impl Formatter {
    /// Creates a formatter with default options and the default color scheme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the color scheme used by the colored mode.
    pub fn set_color_scheme(&mut self, scheme: &ColorScheme) {
        self.colors = scheme.compile();
    }

    /// Renders one record into a newline-terminated line.
    ///
    /// `terminal` is the sink's capability answer; the colored mode is used
    /// when it is `true` or colors are forced.
    pub fn format(&self, record: &Record, terminal: bool) -> Vec<u8> {
        let mut fields = record.fields.clone();
        fields.rename_reserved();

        // An explicit prefix field wins over extraction from the message.
        let (prefix, message) = match fields.get("prefix") {
            Some(value) => (value.to_string(), record.message.as_str()),
            None => {
                let (p, m) = extract_prefix(&record.message);
                (p.to_owned(), m)
            }
        };

        let mut entries: Vec<(&str, &FieldValue)> = fields.iter().collect();
        if !self.disable_sorting {
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        }

        let mut out = String::with_capacity(128);
        if self.force_colors || terminal {
            self.print_colored(&mut out, record, &prefix, message, &entries);
        } else {
            self.print_plain(&mut out, record, &prefix, message, &entries);
        }
        out.push('\n');
        out.into_bytes()
    }

    fn print_plain(
        &self,
        out: &mut String,
        record: &Record,
        prefix: &str,
        message: &str,
        entries: &[(&str, &FieldValue)],
    ) {
        let mut parts: Vec<String> = Vec::with_capacity(entries.len() + 4);
        if !self.disable_timestamp {
            let stamp = self.wall_timestamp(record);
            parts.push(format!("time:{}", self.render_str(&stamp)));
        }
        parts.push(format!("level:{}", self.render_str(record.level.as_str())));
        if !prefix.is_empty() {
            parts.push(format!("prefix:{}", self.render_str(prefix)));
        }
        if !message.is_empty() {
            // The message is always quoted.
            parts.push(format!("msg:{}", self.quote(message)));
        }
        for (key, value) in entries {
            if *key == "prefix" {
                continue;
            }
            parts.push(format!("{}:{}", key, self.render_value(value)));
        }
        out.push_str(&parts.join(" "));
    }

    fn print_colored(
        &self,
        out: &mut String,
        record: &Record,
        prefix: &str,
        message: &str,
        entries: &[(&str, &FieldValue)],
    ) {
        let style = self.colors.level_style(record.level);

        let mut level_text = record.level.as_str().to_owned();
        if !self.disable_uppercase {
            level_text.make_ascii_uppercase();
        }
        let _ = write!(out, "{}", style.paint(format!("{:>5}", level_text)));

        if !self.disable_timestamp {
            let stamp = if self.full_timestamp {
                format!("[{}]", self.wall_timestamp(record))
            } else {
                format!("[{:04}]", self.epoch.elapsed().as_millis())
            };
            let _ = write!(out, " {}", self.colors.timestamp.paint(stamp));
        }

        let service = entries.iter().find(|(k, _)| *k == "service");
        let version = entries.iter().find(|(k, _)| *k == "version");
        if let (Some((_, service)), Some((_, version))) = (service, version) {
            let _ = write!(out, " {}@{}", service, version);
        }

        if !prefix.is_empty() {
            let _ = write!(out, " {}", self.colors.prefix.paint(format!("{}:", prefix)));
        }
        if !message.is_empty() {
            let _ = write!(out, " {}", message);
        }

        for (key, value) in entries {
            if matches!(*key, "prefix" | "service" | "version") {
                continue;
            }
            let _ = write!(out, " {}={}", style.paint(*key), self.render_value(value));
        }
    }

    /// Whether a string value must be wrapped in quotes.
    ///
    /// The unquoted character set is `[A-Za-z0-9.-]`. The underscore is
    /// deliberately not in it: `underscore_ok` renders quoted.
    pub fn needs_quoting(&self, text: &str) -> bool {
        if text.is_empty() {
            return self.quote_empty_fields;
        }
        !text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.')
    }

    fn render_value(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Str(s) => self.render_str(s),
            other => self.quote(&other.to_string()),
        }
    }

    fn render_str(&self, text: &str) -> String {
        if self.needs_quoting(text) {
            self.quote(text)
        } else {
            text.to_owned()
        }
    }

    // The quote character itself is not escaped inside the value; a value
    // containing it produces an ambiguous line. Known limitation.
    fn quote(&self, text: &str) -> String {
        format!("{q}{text}{q}", q = self.quote_character)
    }

    fn wall_timestamp(&self, record: &Record) -> String {
        let mut stamp = String::new();
        if write!(stamp, "{}", record.time.format(&self.timestamp_format)).is_err() {
            // A broken user-supplied format string must not break the line.
            stamp = record.time.to_rfc3339();
        }
        stamp
    }

    /// Milliseconds elapsed since this formatter was created. The colored
    /// mode prints this instead of a wall-clock timestamp unless
    /// `full_timestamp` is set.
    pub fn elapsed_millis(&self) -> u128 {
        self.epoch.elapsed().as_millis()
    }
}

/// Splits a leading `[tag]` off a message.
///
/// `"[prefix] actual message"` becomes `("prefix", "actual message")` and a
/// single space after the bracket is consumed; `"[p]msg"` becomes
/// `("p", "msg")`. An empty or unterminated bracket leaves the message
/// untouched.
pub(crate) fn extract_prefix(message: &str) -> (&str, &str) {
    if let Some(rest) = message.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            if end > 0 {
                let prefix = &rest[..end];
                let remainder = &rest[end + 1..];
                let remainder = remainder.strip_prefix(' ').unwrap_or(remainder);
                return (prefix, remainder);
            }
        }
    }
    ("", message)
}
