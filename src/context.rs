use std::fmt;
use std::sync::Arc;

use crate::level::Level;
use crate::logger::LoggerCore;
use crate::record::{FieldMap, Record};
use crate::value::FieldValue;

/// A set of log fields bound to a shared output pipeline.
///
/// Contexts are immutable values: [`with_field`](LogContext::with_field) and
/// [`with_fields`](LogContext::with_fields) return a new context and never
/// touch the receiver. That is what makes the base context safe to share
/// across concurrently handled requests: every request derives its own
/// context and no derivation is visible to any other.
///
/// Cloning is cheap; the field set and the pipeline sit behind reference
/// counts.
#[derive(Clone)]
pub struct LogContext {
    core: Arc<LoggerCore>,
    fields: Arc<FieldMap>,
}

impl LogContext {
    pub(crate) fn from_parts(core: LoggerCore, fields: FieldMap) -> Self {
        Self {
            core: Arc::new(core),
            fields: Arc::new(fields),
        }
    }

    /// Returns a new context carrying this context's fields plus one more.
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let mut fields = (*self.fields).clone();
        fields.insert(key, value);
        Self {
            core: Arc::clone(&self.core),
            fields: Arc::new(fields),
        }
    }

    /// Returns a new context carrying this context's fields plus the given
    /// ones.
    pub fn with_fields<I, K, V>(&self, new_fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut fields = (*self.fields).clone();
        for (key, value) in new_fields {
            fields.insert(key, value);
        }
        Self {
            core: Arc::clone(&self.core),
            fields: Arc::new(fields),
        }
    }

    /// The fields this context would attach to a record.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Logs a message at trace level.
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message);
    }

    /// Logs a message at debug level.
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    /// Logs a message at info level.
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    /// Logs a message at warn level.
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    /// Logs a message at error level.
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Logs a message at fatal level. Unlike some logging libraries this
    /// does not terminate the process; exiting is the caller's decision.
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::Fatal, message);
    }

    fn log(&self, level: Level, message: impl Into<String>) {
        let record = Record::new(level, message, (*self.fields).clone());
        self.core.log(&record);
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.fields.iter().map(|(k, _)| k).collect();
        f.debug_struct("LogContext").field("fields", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Logger;

    #[test]
    fn extension_does_not_mutate_the_base() {
        let base = Logger::builder()
            .service("svc")
            .version("1")
            .sink(Vec::new())
            .build();

        let derived = base.with_field("request_id", "abc");

        assert_eq!(base.fields().len(), 2);
        assert!(!base.fields().contains_key("request_id"));
        assert_eq!(derived.fields().len(), 3);
        assert_eq!(derived.fields().get("request_id").unwrap().to_string(), "abc");
    }

    #[test]
    fn extension_replaces_duplicate_keys_in_the_derived_context_only() {
        let base = Logger::builder()
            .service("svc")
            .version("1")
            .sink(Vec::new())
            .build();

        let derived = base.with_field("version", "2");

        assert_eq!(base.fields().get("version").unwrap().to_string(), "1");
        assert_eq!(derived.fields().get("version").unwrap().to_string(), "2");
        assert_eq!(derived.fields().len(), 2);
    }

    #[test]
    fn concurrent_derivations_are_isolated() {
        let base = Logger::builder()
            .service("svc")
            .version("1")
            .sink(Vec::new())
            .build();

        let handles: Vec<_> = (0..128)
            .map(|worker| {
                let base = base.clone();
                std::thread::spawn(move || {
                    let derived = base
                        .with_field("worker", worker as i64)
                        .with_field("tag", format!("job-{worker}"));

                    assert_eq!(
                        derived.fields().get("worker").unwrap().to_string(),
                        worker.to_string()
                    );
                    assert_eq!(
                        derived.fields().get("tag").unwrap().to_string(),
                        format!("job-{worker}")
                    );
                    // Only the base fields plus this derivation's own two.
                    assert_eq!(derived.fields().len(), 4);
                    assert!(!base.fields().contains_key("worker"));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(base.fields().len(), 2);
        assert!(!base.fields().contains_key("worker"));
        assert!(!base.fields().contains_key("tag"));
    }
}
