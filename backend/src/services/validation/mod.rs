//! # Variable Validator
//!
//! Pure validation of an untrusted variable map against a template's declared
//! schema. Every field is checked independently and every problem is surfaced
//! in one pass, so a form can highlight all offending inputs at once.
//!
//! The function never panics: malformed user-supplied regex patterns, wrong
//! JSON value shapes, and unsupported declared types all come back as
//! per-field errors. Keys present in the input but absent from the schema are
//! ignored entirely, which bounds what can ever reach the merge step.
//!
//! STRING/TEXT values are HTML-escaped on success because they are later
//! merged verbatim into a document; this is the only XSS-adjacent control in
//! the pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use common::model::validation::{ErrorCode, FieldError, SanitizedValue, ValidationResult};
use common::model::variable::{VariableDefinition, VariableType};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Validates `input` against `schema`, producing per-field errors and the map
/// of successfully coerced values.
///
/// The sanitized map is filled for every field that validates, even when
/// other fields fail; callers must only act on it when `valid` is true.
pub fn validate(schema: &[VariableDefinition], input: &Map<String, Value>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut sanitized = HashMap::new();

    for def in schema {
        let value = input.get(&def.name);
        if is_absent(value) {
            if def.required {
                errors.push(FieldError {
                    field: def.name.clone(),
                    code: ErrorCode::Required,
                    message: format!("{} is required", def.label),
                });
            }
            // Optional and absent: silently omitted from the sanitized map.
            continue;
        }
        let Some(value) = value else { continue };

        match check_field(def, value) {
            Ok(clean) => {
                sanitized.insert(def.name.clone(), clean);
            }
            Err((code, message)) => errors.push(FieldError {
                field: def.name.clone(),
                code,
                message,
            }),
        }
    }

    ValidationResult::new(errors, sanitized)
}

/// Missing, null, blank-string, and empty-array values all count as absent.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

type FieldResult = Result<SanitizedValue, (ErrorCode, String)>;

fn check_field(def: &VariableDefinition, value: &Value) -> FieldResult {
    match def.var_type {
        VariableType::String | VariableType::Text => check_text(def, value),
        VariableType::Date => check_date(def, value),
        VariableType::Number | VariableType::Currency => check_number(def, value),
        VariableType::Select => check_select(def, value),
        VariableType::Multiselect => check_multiselect(def, value),
        VariableType::Phone => check_phone(def, value),
        VariableType::Email => check_email(def, value),
        VariableType::Unknown => Err((
            ErrorCode::InvalidType,
            format!("{} has an unsupported variable type", def.label),
        )),
    }
}

fn check_text(def: &VariableDefinition, value: &Value) -> FieldResult {
    let Value::String(raw) = value else {
        return Err((
            ErrorCode::InvalidType,
            format!("{} must be text", def.label),
        ));
    };
    let trimmed = raw.trim();
    let length = trimmed.chars().count() as u32;

    if def.min_length > 0 && length < def.min_length {
        return Err((
            ErrorCode::MinLength,
            format!("{} must be at least {} characters", def.label, def.min_length),
        ));
    }
    if def.max_length > 0 && length > def.max_length {
        return Err((
            ErrorCode::MaxLength,
            format!("{} must be at most {} characters", def.label, def.max_length),
        ));
    }
    if !def.pattern.is_empty() {
        // A malformed pattern is a validation failure, never a crash.
        match Regex::new(&def.pattern) {
            Ok(re) if re.is_match(trimmed) => {}
            _ => {
                return Err((
                    ErrorCode::Pattern,
                    format!("{} has an invalid format", def.label),
                ));
            }
        }
    }

    Ok(SanitizedValue::Text(escape_html(trimmed)))
}

fn check_date(def: &VariableDefinition, value: &Value) -> FieldResult {
    let parsed = match value {
        Value::String(s) => parse_date_str(s.trim()),
        // Epoch milliseconds, the convention of the mobile/web clients.
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    };
    match parsed {
        Some(date) => Ok(SanitizedValue::Date(date)),
        None => Err((
            ErrorCode::InvalidDate,
            format!("{} is not a valid date", def.label),
        )),
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

fn check_number(def: &VariableDefinition, value: &Value) -> FieldResult {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|n| n.is_finite()) {
        Some(number) => Ok(SanitizedValue::Number(number)),
        None => Err((
            ErrorCode::InvalidNumber,
            format!("{} is not a valid number", def.label),
        )),
    }
}

fn check_select(def: &VariableDefinition, value: &Value) -> FieldResult {
    if let Value::String(s) = value {
        if !s.is_empty() && def.options.iter().any(|opt| opt.value == *s) {
            return Ok(SanitizedValue::Text(s.clone()));
        }
    }
    Err((
        ErrorCode::InvalidOption,
        format!("{} is not one of the allowed options", def.label),
    ))
}

fn check_multiselect(def: &VariableDefinition, value: &Value) -> FieldResult {
    let Value::Array(items) = value else {
        return Err((
            ErrorCode::InvalidOption,
            format!("{} must be a list of options", def.label),
        ));
    };
    let mut selected = Vec::with_capacity(items.len());
    for item in items {
        // Any non-string element or unknown value invalidates the whole field.
        let Value::String(s) = item else {
            return Err((
                ErrorCode::InvalidOption,
                format!("{} contains an invalid option", def.label),
            ));
        };
        if !def.options.iter().any(|opt| opt.value == *s) {
            return Err((
                ErrorCode::InvalidOption,
                format!("{} contains an invalid option", def.label),
            ));
        }
        selected.push(s.clone());
    }
    Ok(SanitizedValue::List(selected))
}

fn check_phone(def: &VariableDefinition, value: &Value) -> FieldResult {
    if let Value::String(s) = value {
        let s = s.trim();
        if is_valid_phone(s) {
            return Ok(SanitizedValue::Text(s.to_string()));
        }
    }
    Err((
        ErrorCode::InvalidPhone,
        format!("{} must be a valid 10-digit mobile number", def.label),
    ))
}

/// 10-digit Indian mobile number, first digit 6-9.
fn is_valid_phone(s: &str) -> bool {
    s.len() == 10
        && s.bytes().all(|b| b.is_ascii_digit())
        && matches!(s.as_bytes()[0], b'6'..=b'9')
}

fn check_email(def: &VariableDefinition, value: &Value) -> FieldResult {
    if let Value::String(s) = value {
        let s = s.trim();
        if is_valid_email(s) {
            return Ok(SanitizedValue::Text(s.to_string()));
        }
    }
    Err((
        ErrorCode::InvalidEmail,
        format!("{} must be a valid email address", def.label),
    ))
}

/// Simple `local@domain.tld` shape check.
fn is_valid_email(s: &str) -> bool {
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !local.contains(char::is_whitespace)
                && !domain.contains(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|seg| !seg.is_empty())
        }
        _ => false,
    }
}

/// Escapes `& < > " '` so the value can be merged verbatim into a document.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::variable::SelectOption;
    use serde_json::json;

    fn def(name: &str, var_type: VariableType, required: bool) -> VariableDefinition {
        VariableDefinition {
            name: name.to_string(),
            label: name.to_string(),
            var_type,
            required,
            min_length: 0,
            max_length: 0,
            pattern: String::new(),
            options: vec![],
            order: 0,
        }
    }

    fn input(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_required_field_reported_while_valid_fields_still_sanitize() {
        let schema = vec![
            def("landlord_name", VariableType::String, true),
            def("rent_amount", VariableType::Currency, true),
        ];
        let result = validate(&schema, &input(&[("rent_amount", json!("25000"))]));

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "landlord_name");
        assert_eq!(result.errors[0].code, ErrorCode::Required);
        // Partial sanitized map alongside errors is expected behavior.
        assert_eq!(
            result.sanitized["rent_amount"],
            SanitizedValue::Number(25000.0)
        );
    }

    #[test]
    fn optional_absent_fields_are_silently_omitted() {
        let schema = vec![
            def("notes", VariableType::Text, false),
            def("witness", VariableType::String, false),
            def("clauses", VariableType::Multiselect, false),
        ];
        let result = validate(
            &schema,
            &input(&[("notes", json!("   ")), ("clauses", json!([]))]),
        );
        assert!(result.valid);
        assert!(result.sanitized.is_empty());
    }

    #[test]
    fn strings_are_trimmed_and_html_escaped() {
        let schema = vec![def("name", VariableType::String, true)];
        let result = validate(&schema, &input(&[("name", json!("  O'Brien <&> \"Co\"  "))]));
        assert!(result.valid);
        assert_eq!(
            result.sanitized["name"],
            SanitizedValue::Text("O&#x27;Brien &lt;&amp;&gt; &quot;Co&quot;".to_string())
        );
    }

    #[test]
    fn length_limits_apply_only_when_nonzero() {
        let mut short = def("code", VariableType::String, true);
        short.min_length = 3;
        short.max_length = 5;
        let schema = vec![short];

        let result = validate(&schema, &input(&[("code", json!("ab"))]));
        assert_eq!(result.errors[0].code, ErrorCode::MinLength);

        let result = validate(&schema, &input(&[("code", json!("abcdef"))]));
        assert_eq!(result.errors[0].code, ErrorCode::MaxLength);

        let unlimited = vec![def("code", VariableType::String, true)];
        let result = validate(&unlimited, &input(&[("code", json!("x"))]));
        assert!(result.valid);
    }

    #[test]
    fn pattern_mismatch_and_malformed_pattern_both_fail_with_pattern() {
        let mut pin = def("pin", VariableType::String, true);
        pin.pattern = r"^\d{6}$".to_string();
        let result = validate(&vec![pin.clone()], &input(&[("pin", json!("12a456"))]));
        assert_eq!(result.errors[0].code, ErrorCode::Pattern);

        pin.pattern = "([".to_string();
        let result = validate(&vec![pin], &input(&[("pin", json!("123456"))]));
        assert_eq!(result.errors[0].code, ErrorCode::Pattern);
    }

    #[test]
    fn dates_parse_from_iso_rfc3339_and_epoch_millis() {
        let schema = vec![def("start", VariableType::Date, true)];
        for value in [
            json!("2026-03-01"),
            json!("2026-03-01T10:30:00+05:30"),
            json!(1_772_323_200_000i64),
        ] {
            let result = validate(&schema, &input(&[("start", value)]));
            assert!(result.valid, "errors: {:?}", result.errors);
            assert!(matches!(
                result.sanitized["start"],
                SanitizedValue::Date(_)
            ));
        }

        let result = validate(&schema, &input(&[("start", json!("not-a-date"))]));
        assert_eq!(result.errors[0].code, ErrorCode::InvalidDate);
    }

    #[test]
    fn numbers_accept_numeric_strings_and_reject_the_rest() {
        let schema = vec![def("amount", VariableType::Number, true)];
        let result = validate(&schema, &input(&[("amount", json!("1234.5"))]));
        assert_eq!(result.sanitized["amount"], SanitizedValue::Number(1234.5));

        for bad in [json!("12x"), json!(true), json!({"n": 1})] {
            let result = validate(&schema, &input(&[("amount", bad)]));
            assert_eq!(result.errors[0].code, ErrorCode::InvalidNumber);
        }
    }

    #[test]
    fn select_must_match_an_allowed_option() {
        let mut state = def("state", VariableType::Select, true);
        state.options = vec![
            SelectOption {
                value: "MH".to_string(),
                label: "Maharashtra".to_string(),
            },
            SelectOption {
                value: "KA".to_string(),
                label: "Karnataka".to_string(),
            },
        ];
        let schema = vec![state];

        let result = validate(&schema, &input(&[("state", json!("KA"))]));
        assert_eq!(
            result.sanitized["state"],
            SanitizedValue::Text("KA".to_string())
        );

        let result = validate(&schema, &input(&[("state", json!("TN"))]));
        assert_eq!(result.errors[0].code, ErrorCode::InvalidOption);
    }

    #[test]
    fn multiselect_fails_whole_field_on_any_bad_element() {
        let mut clauses = def("clauses", VariableType::Multiselect, true);
        clauses.options = vec![
            SelectOption {
                value: "lock_in".to_string(),
                label: "Lock-in".to_string(),
            },
            SelectOption {
                value: "notice".to_string(),
                label: "Notice".to_string(),
            },
        ];
        let schema = vec![clauses];

        let result = validate(&schema, &input(&[("clauses", json!(["lock_in", "notice"]))]));
        assert_eq!(
            result.sanitized["clauses"],
            SanitizedValue::List(vec!["lock_in".to_string(), "notice".to_string()])
        );

        for bad in [
            json!(["lock_in", "unknown"]),
            json!(["lock_in", 3]),
            json!("lock_in"),
        ] {
            let result = validate(&schema, &input(&[("clauses", bad)]));
            assert_eq!(result.errors[0].code, ErrorCode::InvalidOption);
        }

        // Empty selection on a required field is a missing value.
        let result = validate(&schema, &input(&[("clauses", json!([]))]));
        assert_eq!(result.errors[0].code, ErrorCode::Required);
    }

    #[test]
    fn phone_requires_ten_digits_starting_six_to_nine() {
        let schema = vec![def("mobile", VariableType::Phone, true)];
        let result = validate(&schema, &input(&[("mobile", json!("9876543210"))]));
        assert!(result.valid);

        for bad in ["1234567890", "98765", "98765432100", "9876abc210"] {
            let result = validate(&schema, &input(&[("mobile", json!(bad))]));
            assert_eq!(result.errors[0].code, ErrorCode::InvalidPhone);
        }
    }

    #[test]
    fn email_shape_check() {
        let schema = vec![def("email", VariableType::Email, true)];
        let result = validate(&schema, &input(&[("email", json!("asha@example.co.in"))]));
        assert!(result.valid);

        for bad in ["plain", "a@b", "@x.com", "a b@x.com", "a@x..com"] {
            let result = validate(&schema, &input(&[("email", json!(bad))]));
            assert_eq!(result.errors[0].code, ErrorCode::InvalidEmail, "{}", bad);
        }
    }

    #[test]
    fn unknown_declared_type_is_a_per_field_error_not_a_crash() {
        let schema = vec![
            def("weird", VariableType::Unknown, true),
            def("name", VariableType::String, true),
        ];
        let result = validate(
            &schema,
            &input(&[("weird", json!("x")), ("name", json!("Asha"))]),
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::InvalidType);
        // The rest of the schema is still processed.
        assert!(result.sanitized.contains_key("name"));
    }

    #[test]
    fn extra_input_keys_are_ignored() {
        let schema = vec![def("name", VariableType::String, true)];
        let result = validate(
            &schema,
            &input(&[("name", json!("Asha")), ("injected", json!("<script>"))]),
        );
        assert!(result.valid);
        assert_eq!(result.sanitized.len(), 1);
        assert!(!result.sanitized.contains_key("injected"));
    }
}
