//! Field-level validation errors.
//!
//! Request bodies are validated field by field and every problem is reported
//! at once, keyed by field name:
//!
//! ```json
//! {"price": ["Price must be positive"], "title": ["This field may not be blank."]}
//! ```
//!
//! Object-level problems use the `non_field_errors` key.

use std::collections::BTreeMap;

use serde::Serialize;

/// Key for errors that are not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Message for a required field that is missing.
pub const REQUIRED: &str = "This field is required.";

/// Message for a required string that is empty.
pub const BLANK: &str = "This field may not be blank.";

/// Collected validation failures, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// An empty set of errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding a single error for `field`.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record an error against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Record the error of a failed result, returning its value if it succeeded.
    pub fn check<T, E: std::fmt::Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Unwrap a required field, recording [`REQUIRED`] when it is absent.
    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, REQUIRED);
        }
        value
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors if any were recorded.
    pub fn finish(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Validate a bounded, non-blank string field.
///
/// Returns the trimmed value, or records an error and returns `None`.
pub fn check_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Option<String> {
    let value = errors.require(field, value)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if trimmed.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
        return None;
    }
    Some(trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("price", "Price must be positive");
        errors.add("title", BLANK);
        errors.add("price", "second");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "price": ["Price must be positive", "second"],
                "title": ["This field may not be blank."]
            })
        );
    }

    #[test]
    fn test_finish() {
        assert!(ValidationErrors::new().finish().is_ok());
        let err = ValidationErrors::single(NON_FIELD_ERRORS, "nope")
            .finish()
            .unwrap_err();
        assert_eq!(err.get(NON_FIELD_ERRORS).unwrap(), ["nope".to_owned()]);
    }

    #[test]
    fn test_check_text() {
        let mut errors = ValidationErrors::new();
        assert_eq!(
            check_text(&mut errors, "title", Some("  Mug ".to_owned()), 255),
            Some("Mug".to_owned())
        );
        assert_eq!(check_text(&mut errors, "a", None, 255), None);
        assert_eq!(check_text(&mut errors, "b", Some("   ".to_owned()), 255), None);
        assert_eq!(check_text(&mut errors, "c", Some("abcd".to_owned()), 3), None);

        assert_eq!(errors.get("a").unwrap(), [REQUIRED.to_owned()]);
        assert_eq!(errors.get("b").unwrap(), [BLANK.to_owned()]);
        assert_eq!(
            errors.get("c").unwrap(),
            ["Ensure this field has no more than 3 characters.".to_owned()]
        );
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("a", "x");
        errors.add("b", "y");
        assert_eq!(errors.to_string(), "a: x; b: y");
    }
}
