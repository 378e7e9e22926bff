//! Field-level validation errors shared by the domain modules.
//!
//! Rendered to clients as `{"field": ["message", ...]}` so a form can
//! attach each message to its input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

/// Trimmed copy of a required text field, recording an error when blank.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            errors.add(field, "This field is required.");
            String::new()
        }
    }
}

/// Record an error when `value` is longer than `max` characters.
pub fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parse a choice field, recording `"x" is not a valid choice.` on failure.
pub fn parse_choice<T: std::str::FromStr>(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("\"{value}\" is not a valid choice."));
            None
        }
    }
}

/// Age in years, bounded to a plausible human range.
pub fn parse_age(errors: &mut FieldErrors, field: &str, value: i64) -> Option<u16> {
    match u16::try_from(value) {
        Ok(age) if age <= 150 => Some(age),
        _ => {
            errors.add(field, "Ensure this value is between 0 and 150.");
            None
        }
    }
}
