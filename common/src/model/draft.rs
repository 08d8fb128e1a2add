use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted record of one generation event.
///
/// Everything except `generated_file_url`/`expires_at` is immutable after
/// creation; those two are rewritten together whenever the access window
/// lapses and a fresh URL is issued for the stored blob.
///
/// `expires_at` is kept as the raw stored string: an unparsable value must
/// be treated as already expired rather than rejected, so parsing is the
/// reader's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub user_id: String,
    pub template_id: String,
    pub template_name: String,
    pub category_name: String,
    #[serde(rename = "generatedFileURL")]
    pub generated_file_url: String,
    /// The formatted variable map that was merged into the document,
    /// retained for audit and re-display.
    pub variables: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: String,
}

/// A draft as returned by the history listing: the full record minus its
/// variable map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub id: String,
    pub user_id: String,
    pub template_id: String,
    pub template_name: String,
    pub category_name: String,
    #[serde(rename = "generatedFileURL")]
    pub generated_file_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: String,
}

impl From<Draft> for DraftSummary {
    fn from(d: Draft) -> Self {
        DraftSummary {
            id: d.id,
            user_id: d.user_id,
            template_id: d.template_id,
            template_name: d.template_name,
            category_name: d.category_name,
            generated_file_url: d.generated_file_url,
            created_at: d.created_at,
            expires_at: d.expires_at,
        }
    }
}
