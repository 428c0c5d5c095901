//! Per-field validation results.
//!
//! Validation never short-circuits: every failing field contributes one
//! `(field, message)` pair and callers decide what to do with the set.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Message used when a required value is missing or blank.
pub const BLANK: &str = "can't be blank";
/// Message used when a required parent reference does not resolve.
pub const MUST_EXIST: &str = "must exist";

/// One failed check on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Ordered collection of field errors produced by `validate()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages recorded for one field, in insertion order.
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|error| error.field == field)
            .map(|error| error.message.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Human-readable `"<field> <message>"` lines.
    pub fn full_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|error| format!("{} {}", error.field, error.message))
            .collect()
    }

    /// `Ok(())` when no field failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed: {}", self.full_messages().join(", "))
    }
}

impl Error for ValidationErrors {}

/// Presence check: `None`, empty and whitespace-only values are blank.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}
