use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Machine-readable reason a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    InvalidDate,
    InvalidNumber,
    InvalidOption,
    InvalidPhone,
    InvalidEmail,
    InvalidType,
}

/// One validation failure, addressable to the form field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: ErrorCode,
    pub message: String,
}

/// A value that passed validation, coerced to its declared type.
///
/// Dates are kept as parsed calendar dates here; turning them (and numbers,
/// phones, selections) into presentation strings is the merge engine's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SanitizedValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    List(Vec<String>),
}

/// Outcome of validating one submission against a template's schema.
///
/// `valid` is true iff `errors` is empty. `sanitized` holds every field that
/// validated successfully, even when other fields failed; callers must only
/// act on it when `valid` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
    pub sanitized: HashMap<String, SanitizedValue>,
}

impl ValidationResult {
    pub fn new(errors: Vec<FieldError>, sanitized: HashMap<String, SanitizedValue>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
            sanitized,
        }
    }
}
