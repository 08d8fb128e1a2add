//! Presentation formatting of sanitized values, applied just before merge.
//!
//! This is a second, display-oriented transform, distinct from validation's
//! type coercion: dates become `DD/MM/YYYY`, amounts get Indian lakh/crore
//! digit grouping, phones get the `+91 XXXXX XXXXX` shape. STRING/TEXT/
//! SELECT/EMAIL values are already final after validation and pass through.

use common::model::validation::SanitizedValue;
use common::model::variable::{VariableDefinition, VariableType};
use num_format::{Buffer, CustomFormat, Grouping};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

fn indian_format() -> &'static CustomFormat {
    static FORMAT: OnceLock<CustomFormat> = OnceLock::new();
    FORMAT.get_or_init(|| {
        CustomFormat::builder()
            .grouping(Grouping::Indian)
            .separator(",")
            .build()
            .expect("static number format is well-formed")
    })
}

fn group_indian(n: u64) -> String {
    let mut buf = Buffer::default();
    buf.write_formatted(&n, indian_format());
    buf.as_str().to_string()
}

/// Indian-grouped number, up to two decimal places, trailing zeros trimmed.
fn format_number(n: f64) -> String {
    let negative = n < 0.0;
    let scaled = (n.abs() * 100.0).round() as u64;
    let mut out = group_indian(scaled / 100);
    let cents = scaled % 100;
    if cents != 0 {
        let frac = format!("{:02}", cents);
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

/// Rupee-prefixed amount with zero fractional digits: `100000` → `₹1,00,000`.
fn format_currency(n: f64) -> String {
    let negative = n < 0.0;
    let rupees = group_indian(n.abs().round() as u64);
    if negative {
        format!("-₹{}", rupees)
    } else {
        format!("₹{}", rupees)
    }
}

/// `+91 XXXXX XXXXX` grouping of a validated 10-digit number.
fn format_phone(digits: &str) -> String {
    if digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()) {
        format!("+91 {} {}", &digits[..5], &digits[5..])
    } else {
        digits.to_string()
    }
}

/// Formats one sanitized value according to its declared type.
pub fn format_value(def: &VariableDefinition, value: &SanitizedValue) -> String {
    match (def.var_type, value) {
        (VariableType::Date, SanitizedValue::Date(date)) => date.format("%d/%m/%Y").to_string(),
        (VariableType::Currency, SanitizedValue::Number(n)) => format_currency(*n),
        (VariableType::Number, SanitizedValue::Number(n)) => format_number(*n),
        (VariableType::Phone, SanitizedValue::Text(s)) => format_phone(s),
        (VariableType::Multiselect, SanitizedValue::List(items)) => items.join(", "),
        // STRING/TEXT/SELECT/EMAIL, plus any type/value mismatch: render as-is.
        (_, SanitizedValue::Text(s)) => s.clone(),
        (_, SanitizedValue::Number(n)) => format_number(*n),
        (_, SanitizedValue::Date(date)) => date.format("%d/%m/%Y").to_string(),
        (_, SanitizedValue::List(items)) => items.join(", "),
    }
}

/// Builds the merge map: only variables present in both the schema and the
/// sanitized map are included; omitted optional fields get no entry at all.
pub fn build_merge_map(
    schema: &[VariableDefinition],
    sanitized: &HashMap<String, SanitizedValue>,
) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for def in schema {
        if let Some(value) = sanitized.get(&def.name) {
            map.insert(def.name.clone(), format_value(def, value));
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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
    fn dates_format_zero_padded_dd_mm_yyyy() {
        let date = SanitizedValue::Date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(format_value(&def("d", VariableType::Date), &date), "01/03/2026");
    }

    #[test]
    fn currency_uses_indian_grouping_and_no_fraction() {
        let cases = [
            (100000.0, "₹1,00,000"),
            (1000.0, "₹1,000"),
            (10000000.0, "₹1,00,00,000"),
            (999.0, "₹999"),
            (25000.6, "₹25,001"),
        ];
        for (n, expected) in cases {
            assert_eq!(
                format_value(&def("c", VariableType::Currency), &SanitizedValue::Number(n)),
                expected
            );
        }
    }

    #[test]
    fn numbers_use_indian_grouping_with_trimmed_fraction() {
        let cases = [
            (1234567.0, "12,34,567"),
            (1234.5, "1,234.5"),
            (0.25, "0.25"),
            (-100000.0, "-1,00,000"),
        ];
        for (n, expected) in cases {
            assert_eq!(
                format_value(&def("n", VariableType::Number), &SanitizedValue::Number(n)),
                expected
            );
        }
    }

    #[test]
    fn phones_group_as_plus91_five_five() {
        assert_eq!(
            format_value(
                &def("p", VariableType::Phone),
                &SanitizedValue::Text("9876543210".to_string())
            ),
            "+91 98765 43210"
        );
    }

    #[test]
    fn multiselect_joins_with_comma_and_space() {
        assert_eq!(
            format_value(
                &def("m", VariableType::Multiselect),
                &SanitizedValue::List(vec!["lock_in".to_string(), "notice".to_string()])
            ),
            "lock_in, notice"
        );
    }

    #[test]
    fn merge_map_skips_fields_absent_from_the_sanitized_map() {
        let schema = vec![
            def("present", VariableType::String),
            def("absent", VariableType::String),
        ];
        let sanitized = HashMap::from([(
            "present".to_string(),
            SanitizedValue::Text("value".to_string()),
        )]);
        let map = build_merge_map(&schema, &sanitized);
        assert_eq!(map.len(), 1);
        assert_eq!(map["present"], "value");
        assert!(!map.contains_key("absent"));
    }
}
