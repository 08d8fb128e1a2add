use serde::{Deserialize, Serialize};

/// The declared type of a template variable. Validation and presentation
/// formatting both dispatch on this enum.
///
/// Template schemas are stored as JSON, so a template authored with a type
/// this build does not know about deserializes to `Unknown` rather than
/// failing the whole schema; the validator reports it as a per-field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    String,
    Text,
    Date,
    Number,
    Currency,
    Select,
    Multiselect,
    Phone,
    Email,
    #[serde(other)]
    Unknown,
}

/// One selectable choice for a `Select`/`Multiselect` variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Describes a single form field on a template: the merge placeholder name,
/// its declared type, and the constraints user input must satisfy.
///
/// `name` must be unique within a template's variable list; both validation
/// and merge index by it. `min_length`/`max_length` of `0` mean "no limit".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min_length: u32,
    #[serde(default)]
    pub max_length: u32,
    /// Optional regular expression applied to STRING/TEXT values.
    #[serde(default)]
    pub pattern: String,
    /// Allowed choices for SELECT/MULTISELECT; empty for other types.
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// Presentation order, passed through untouched.
    #[serde(default)]
    pub order: i32,
}
