//! # Document Merge Engine
//!
//! Pure merge of formatted variable values into a template's `{{name}}`
//! placeholders. The engine has no side effects and no knowledge of stores or
//! quotas; the orchestrator hands it the template binary and the validator's
//! sanitized map and gets back the output binary plus merge metadata.
//!
//! Both failure modes, an unreadable template container and a placeholder
//! syntax error, surface as the same `MergeError` to the caller: neither is a
//! validation problem and neither is recoverable without a different
//! template.

pub mod format;

use chrono::{DateTime, Utc};
use common::model::validation::SanitizedValue;
use common::model::variable::VariableDefinition;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("template is not a valid document: {0}")]
    InvalidContainer(#[from] std::str::Utf8Error),
    #[error("template rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone)]
pub struct MergeMetadata {
    pub generated_at: DateTime<Utc>,
    /// Number of keys actually placed into the merge map, not the schema size.
    pub variable_count: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub bytes: Vec<u8>,
    /// The formatted map that was merged, retained on the draft for audit.
    pub variables: BTreeMap<String, String>,
    pub metadata: MergeMetadata,
}

/// Merges `sanitized` values into `template`, formatting each per its
/// declared type first.
///
/// Placeholders whose variable was omitted from the input are left untouched;
/// the engine does not invent blank substitutions.
pub fn generate(
    template: &[u8],
    sanitized: &HashMap<String, SanitizedValue>,
    schema: &[VariableDefinition],
) -> Result<MergeOutput, MergeError> {
    let text = std::str::from_utf8(template)?;
    check_placeholder_syntax(text)?;

    let variables = format::build_merge_map(schema, sanitized);
    let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}")
        .map_err(|e| MergeError::Render(e.to_string()))?;
    let merged = placeholder.replace_all(text, |caps: &regex::Captures| {
        match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    });

    let variable_count = variables.len();
    Ok(MergeOutput {
        bytes: merged.into_owned().into_bytes(),
        variables,
        metadata: MergeMetadata {
            generated_at: Utc::now(),
            variable_count,
        },
    })
}

/// Every `{{` must be closed by `}}` before the next `{{` or end of input.
fn check_placeholder_syntax(text: &str) -> Result<(), MergeError> {
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) if !after[..close].contains("{{") => rest = &after[close + 2..],
            _ => {
                return Err(MergeError::Render(
                    "unterminated placeholder delimiter".to_string(),
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::model::variable::VariableType;

    fn def(name: &str, var_type: VariableType) -> VariableDefinition {
        VariableDefinition {
            name: name.to_string(),
            label: name.to_string(),
            var_type,
            required: true,
            min_length: 0,
            max_length: 0,
            pattern: String::new(),
            options: vec![],
            order: 0,
        }
    }

    #[test]
    fn substitutes_formatted_values_into_placeholders() {
        let schema = vec![
            def("landlord_name", VariableType::String),
            def("rent_amount", VariableType::Currency),
            def("start_date", VariableType::Date),
        ];
        let sanitized = HashMap::from([
            (
                "landlord_name".to_string(),
                SanitizedValue::Text("Asha".to_string()),
            ),
            ("rent_amount".to_string(), SanitizedValue::Number(100000.0)),
            (
                "start_date".to_string(),
                SanitizedValue::Date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            ),
        ]);
        let template = b"Lease by {{landlord_name}} at {{ rent_amount }} from {{start_date}}.";

        let output = generate(template, &sanitized, &schema).unwrap();
        assert_eq!(
            String::from_utf8(output.bytes).unwrap(),
            "Lease by Asha at \u{20b9}1,00,000 from 01/03/2026."
        );
        assert_eq!(output.metadata.variable_count, 3);
    }

    #[test]
    fn omitted_fields_are_left_unsubstituted() {
        let schema = vec![
            def("present", VariableType::String),
            def("absent", VariableType::String),
        ];
        let sanitized = HashMap::from([(
            "present".to_string(),
            SanitizedValue::Text("here".to_string()),
        )]);

        let output = generate(b"{{present}} / {{absent}}", &sanitized, &schema).unwrap();
        assert_eq!(String::from_utf8(output.bytes).unwrap(), "here / {{absent}}");
        assert_eq!(output.metadata.variable_count, 1);
    }

    #[test]
    fn placeholders_not_in_schema_are_never_substituted() {
        let schema = vec![def("known", VariableType::String)];
        let sanitized = HashMap::from([
            ("known".to_string(), SanitizedValue::Text("v".to_string())),
            // Not in schema, so never reaches the merge map.
            ("smuggled".to_string(), SanitizedValue::Text("x".to_string())),
        ]);
        let output = generate(b"{{known}} {{smuggled}}", &sanitized, &schema).unwrap();
        assert_eq!(String::from_utf8(output.bytes).unwrap(), "v {{smuggled}}");
    }

    #[test]
    fn invalid_container_is_reported() {
        let err = generate(&[0xff, 0xfe, 0x00], &HashMap::new(), &[]).unwrap_err();
        assert!(matches!(err, MergeError::InvalidContainer(_)));
    }

    #[test]
    fn unterminated_placeholder_is_a_render_error() {
        let err = generate(b"Hello {{name", &HashMap::new(), &[]).unwrap_err();
        assert!(matches!(err, MergeError::Render(_)));

        let err = generate(b"{{a {{b}}", &HashMap::new(), &[]).unwrap_err();
        assert!(matches!(err, MergeError::Render(_)));
    }
}
