use chrono::{DateTime, Local};

use crate::level::Level;
use crate::value::FieldValue;

/// Record keys written by the formatter itself. Caller-supplied fields with
/// one of these names are renamed before rendering so they cannot overwrite
/// the built-in values.
pub(crate) const RESERVED_KEYS: [&str; 3] = ["time", "msg", "level"];

/// An insertion-ordered map of log fields with unique keys.
///
/// Inserting an existing key replaces its value in place, so the original
/// position is kept. The formatter sorts keys lexicographically at render
/// time unless sorting is disabled.
#[derive(Clone, Debug, Default)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    /// Creates an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Removes a field, returning its value when it was present.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Looks up a field by name.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    /// Whether a field with the given name exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renames caller fields clashing with the reserved record keys by
    /// prefixing them with `fields.`, e.g. `time` becomes `fields.time`.
    pub(crate) fn rename_reserved(&mut self) {
        for reserved in RESERVED_KEYS {
            if let Some(value) = self.remove(reserved) {
                self.insert(format!("fields.{}", reserved), value);
            }
        }
    }
}

/// One log record: what a single emit call hands to the formatter.
#[derive(Clone, Debug)]
pub struct Record {
    /// Severity of the record.
    pub level: Level,
    /// Wall-clock time the record was created.
    pub time: DateTime<Local>,
    /// The log message, possibly carrying a `[prefix]` tag.
    pub message: String,
    /// Caller-supplied fields.
    pub fields: FieldMap,
}

impl Record {
    /// Creates a record stamped with the current wall-clock time.
    pub fn new(level: Level, message: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            level,
            time: Local::now(),
            message: message.into(),
            fields,
        }
    }
}
