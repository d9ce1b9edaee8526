//! Logger interface for services that take their sink as a dependency.
//!
//! Infrastructure services (persistence, migrations) receive an
//! `Arc<dyn Logger>` instead of calling `tracing` directly, so callers can
//! route or capture their output.
//!
//! ## Field rendering
//!
//! `tracing` events carry a field set fixed at the call site, so
//! [`TracingLogger`] cannot turn runtime keys into event fields. The pairs
//! are recorded under a single `fields` key in logfmt form
//! (`migration_version=7 context="loading order"`): values that are empty or
//! contain whitespace, `=` or `"` are quoted and escaped, so the string
//! splits back into the original pairs.

use std::fmt;

/// Key/value pair attached to a log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str, fields: &[Field]);
    fn info(&self, msg: &str, fields: &[Field]);
    fn warn(&self, msg: &str, fields: &[Field]);
    fn error(&self, msg: &str, fields: &[Field]);

    /// Log at error level, then terminate the process.
    fn fatal(&self, msg: &str, fields: &[Field]) -> ! {
        self.error(msg, fields);
        std::process::exit(1)
    }
}

/// `Logger` backed by the process-wide `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    name: &'static str,
}

impl TracingLogger {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("svckit")
    }
}

/// Renders fields as logfmt `key=value` pairs separated by spaces.
pub struct DisplayFields<'a>(pub &'a [Field]);

impl fmt::Display for DisplayFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, field) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            if needs_quoting(&field.value) {
                write!(f, "{}={:?}", field.key, field.value)?;
            } else {
                write!(f, "{}={}", field.key, field.value)?;
            }
        }
        Ok(())
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '=' || c == '"' || c.is_control())
}

impl Logger for TracingLogger {
    fn debug(&self, msg: &str, fields: &[Field]) {
        ::tracing::debug!(logger = self.name, fields = %DisplayFields(fields), "{msg}");
    }

    fn info(&self, msg: &str, fields: &[Field]) {
        ::tracing::info!(logger = self.name, fields = %DisplayFields(fields), "{msg}");
    }

    fn warn(&self, msg: &str, fields: &[Field]) {
        ::tracing::warn!(logger = self.name, fields = %DisplayFields(fields), "{msg}");
    }

    fn error(&self, msg: &str, fields: &[Field]) {
        ::tracing::error!(logger = self.name, fields = %DisplayFields(fields), "{msg}");
    }
}
