use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// A single log field value.
///
/// The formatter renders each variant differently: strings go through the
/// quoting rule, while every other variant is stringified and always quoted.
/// Dynamic values are reference-counted so a value attached to the base
/// context can be shared by every request-scoped context derived from it.
#[derive(Clone)]
pub enum FieldValue {
    /// A plain string, subject to the quoting rule.
    Str(String),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An error, rendered through its `Display` impl.
    Error(Arc<dyn Error + Send + Sync>),
    /// Anything else with a `Display` impl.
    Display(Arc<dyn fmt::Display + Send + Sync>),
    /// Anything else with a `Debug` impl, rendered as `{:?}`.
    Debug(Arc<dyn fmt::Debug + Send + Sync>),
}

impl FieldValue {
    /// Wraps an error value.
    pub fn error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        FieldValue::Error(Arc::new(err))
    }

    /// Wraps an arbitrary displayable value.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        FieldValue::Display(Arc::new(value))
    }

    /// Wraps an arbitrary debuggable value. This is the generic fallback for
    /// types without a `Display` impl; the rendered line carries the `{:?}`
    /// representation.
    pub fn debug<T>(value: T) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        FieldValue::Debug(Arc::new(value))
    }

    /// Returns the string content when this is a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Error(e) => write!(f, "{}", e),
            FieldValue::Display(d) => write!(f, "{}", d),
            FieldValue::Debug(d) => write!(f, "{:?}", d),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            FieldValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            FieldValue::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            FieldValue::Float(v) => f.debug_tuple("Float").field(v).finish(),
            FieldValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            FieldValue::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            FieldValue::Display(d) => f.debug_tuple("Display").field(&d.to_string()).finish(),
            FieldValue::Debug(d) => f.debug_tuple("Debug").field(d).finish(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::UInt(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::UInt(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UInt(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::UInt(value as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}
