use nu_ansi_term::{Color, Style};
use once_cell::sync::Lazy;

use crate::level::Level;

const DEFAULT_TRACE_STYLE: &str = "blue+h";
const DEFAULT_DEBUG_STYLE: &str = "blue";
const DEFAULT_INFO_STYLE: &str = "green";
const DEFAULT_WARN_STYLE: &str = "yellow";
const DEFAULT_ERROR_STYLE: &str = "red";
const DEFAULT_FATAL_STYLE: &str = "red+b";
const DEFAULT_PREFIX_STYLE: &str = "cyan";
const DEFAULT_TIMESTAMP_STYLE: &str = "black+h";

pub(crate) static DEFAULT_COMPILED_SCHEME: Lazy<CompiledColorScheme> =
    Lazy::new(|| ColorScheme::default().compile());

/// Per-level display styles for the colored render mode.
///
/// Styles are textual: a color name optionally followed by `+` modifiers,
/// e.g. `"red"`, `"cyan+b"` (bold), `"black+h"` (bright/high intensity),
/// `"green+u"` (underline). An empty field falls back to the built-in
/// default for that slot; an unknown color name degrades to no color.
///
/// ```
/// use actix_request_log::{ColorScheme, Formatter};
///
/// let mut formatter = Formatter::new();
/// formatter.set_color_scheme(&ColorScheme {
///     info_level_style: "red".into(),
///     ..ColorScheme::default()
/// });
/// ```
#[derive(Clone, Debug)]
pub struct ColorScheme {
    /// Style for the trace level token.
    pub trace_level_style: String,
    /// Style for the debug level token.
    pub debug_level_style: String,
    /// Style for the info level token.
    pub info_level_style: String,
    /// Style for the warn level token.
    pub warn_level_style: String,
    /// Style for the error level token.
    pub error_level_style: String,
    /// Style for the fatal level token.
    pub fatal_level_style: String,
    /// Style for the extracted message prefix.
    pub prefix_style: String,
    /// Style for the timestamp token.
    pub timestamp_style: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            trace_level_style: DEFAULT_TRACE_STYLE.to_owned(),
            debug_level_style: DEFAULT_DEBUG_STYLE.to_owned(),
            info_level_style: DEFAULT_INFO_STYLE.to_owned(),
            warn_level_style: DEFAULT_WARN_STYLE.to_owned(),
            error_level_style: DEFAULT_ERROR_STYLE.to_owned(),
            fatal_level_style: DEFAULT_FATAL_STYLE.to_owned(),
            prefix_style: DEFAULT_PREFIX_STYLE.to_owned(),
            timestamp_style: DEFAULT_TIMESTAMP_STYLE.to_owned(),
        }
    }
}

impl ColorScheme {
    pub(crate) fn compile(&self) -> CompiledColorScheme {
        CompiledColorScheme {
            trace: compile_style(&self.trace_level_style, DEFAULT_TRACE_STYLE),
            debug: compile_style(&self.debug_level_style, DEFAULT_DEBUG_STYLE),
            info: compile_style(&self.info_level_style, DEFAULT_INFO_STYLE),
            warn: compile_style(&self.warn_level_style, DEFAULT_WARN_STYLE),
            error: compile_style(&self.error_level_style, DEFAULT_ERROR_STYLE),
            fatal: compile_style(&self.fatal_level_style, DEFAULT_FATAL_STYLE),
            prefix: compile_style(&self.prefix_style, DEFAULT_PREFIX_STYLE),
            timestamp: compile_style(&self.timestamp_style, DEFAULT_TIMESTAMP_STYLE),
        }
    }
}

/// A scheme with every style string parsed down to an ANSI `Style`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CompiledColorScheme {
    pub(crate) trace: Style,
    pub(crate) debug: Style,
    pub(crate) info: Style,
    pub(crate) warn: Style,
    pub(crate) error: Style,
    pub(crate) fatal: Style,
    pub(crate) prefix: Style,
    pub(crate) timestamp: Style,
}

impl CompiledColorScheme {
    pub(crate) fn level_style(&self, level: Level) -> Style {
        match level {
            Level::Trace => self.trace,
            Level::Debug => self.debug,
            Level::Info => self.info,
            Level::Warn => self.warn,
            Level::Error => self.error,
            Level::Fatal => self.fatal,
        }
    }
}

fn compile_style(spec: &str, fallback: &str) -> Style {
    if spec.is_empty() {
        parse_style(fallback)
    } else {
        parse_style(spec)
    }
}

fn parse_style(spec: &str) -> Style {
    let mut segments = spec.split('+');
    let name = segments.next().unwrap_or_default();

    let mut bold = false;
    let mut bright = false;
    let mut underline = false;
    for segment in segments {
        for ch in segment.chars() {
            match ch {
                'b' => bold = true,
                'h' => bright = true,
                'u' => underline = true,
                _ => {}
            }
        }
    }

    let color = match (name, bright) {
        ("black", false) => Some(Color::Black),
        ("black", true) => Some(Color::DarkGray),
        ("red", false) => Some(Color::Red),
        ("red", true) => Some(Color::LightRed),
        ("green", false) => Some(Color::Green),
        ("green", true) => Some(Color::LightGreen),
        ("yellow", false) => Some(Color::Yellow),
        ("yellow", true) => Some(Color::LightYellow),
        ("blue", false) => Some(Color::Blue),
        ("blue", true) => Some(Color::LightBlue),
        ("magenta", false) => Some(Color::Magenta),
        ("magenta", true) => Some(Color::LightMagenta),
        ("cyan", false) => Some(Color::Cyan),
        ("cyan", true) => Some(Color::LightCyan),
        ("white", false) => Some(Color::White),
        ("white", true) => Some(Color::LightGray),
        _ => None,
    };

    let mut style = match color {
        Some(color) => Style::new().fg(color),
        None => Style::new(),
    };
    if bold {
        style = style.bold();
    }
    if underline {
        style = style.underline();
    }
    style
}
