use serde::{Deserialize, Serialize};

/// Request payload for the draft creation endpoint.
/// Carries the template identifier and the raw, untrusted variable map.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftRequest {
    pub template_id: String,
    pub variables: serde_json::Map<String, serde_json::Value>,
}

/// Successful outcome of a draft creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftCreated {
    pub draft_id: String,
    pub download_url: String,
    pub expires_at: String,
}

/// Page window requested on the history endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Pagination block returned alongside history listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
}
