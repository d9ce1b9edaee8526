//! Field-level validation errors.
//!
//! A validation step reports every offending field at once; `HttpError`
//! absorbs the mapping so it can be rendered as `fields` in the error
//! envelope.

use std::fmt;

use indexmap::IndexMap;

/// Multi-field validation error: field name -> message.
///
/// Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    fields: IndexMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.insert(field, message);
        self
    }

    /// Record an error for `field`, replacing any earlier message for it.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when no field failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, message)) in self.fields.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        if !self.fields.is_empty() {
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl<K, V> FromIterator<(K, V)> for FieldErrors
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut errors = FieldErrors::new();
        for (field, message) in iter {
            errors.insert(field, message);
        }
        errors
    }
}

/// Types that can check their own field-level invariants.
///
/// Implemented by request payloads; see `ValidJson` in `svckit-api`.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_fields_in_insertion_order() {
        let errs = FieldErrors::new()
            .with("name", "cannot be blank")
            .with("age", "must be positive");

        assert_eq!(errs.to_string(), "name: cannot be blank; age: must be positive.");
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());

        let err = FieldErrors::new().with("age", "required").into_result().unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.get("age"), Some("required"));
    }

    #[test]
    fn insert_replaces_previous_message() {
        let mut errs = FieldErrors::new();
        errs.insert("email", "required");
        errs.insert("email", "must be a valid address");

        assert_eq!(errs.len(), 1);
        assert_eq!(errs.get("email"), Some("must be a valid address"));
    }
}
