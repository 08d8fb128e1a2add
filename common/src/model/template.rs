use crate::model::variable::VariableDefinition;
use serde::{Deserialize, Serialize};

/// Template metadata plus its declared variable schema.
///
/// The template's document binary is stored separately and fetched on demand;
/// this struct is what the orchestrator loads to validate a submission.
/// Inactive templates behave as if deleted for generation purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category_name: String,
    pub active: bool,
    pub variables: Vec<VariableDefinition>,
}
