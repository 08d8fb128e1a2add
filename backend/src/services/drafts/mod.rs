//! # Draft Service Module
//!
//! Routes for draft generation and history, plus the orchestrator that the
//! handlers delegate to. The orchestrator is the only component with side
//! effects on quota and storage; validation and merge stay pure underneath
//! it.
//!
//! ## Registered Routes:
//!
//! *   **`POST /api/drafts`**:
//!     - **Handler**: `create::process`
//!     - **Description**: Validates the submitted variables against the
//!       template's schema, merges the document, stores the artifact, issues
//!       a one-day access URL, and atomically consumes one unit of the
//!       caller's monthly quota. Quota is checked up front (no work is done
//!       for a caller already at the cap) and consumed only on full success.
//!
//! *   **`GET /api/drafts/history?page&limit`**:
//!     - **Handler**: `history::process`
//!     - **Description**: Returns one page of the caller's drafts, newest
//!       first, without their variable maps. Expired access URLs are
//!       reissued for the stored blob (no regeneration, no quota) and
//!       persisted before the response is built.

mod create;
mod history;

use crate::error::DraftError;
use crate::services::{merge, validation};
use crate::stores::{BlobStore, DraftStore, QuotaStore, TemplateStore};
use actix_web::web::{get, post, scope};
use actix_web::{HttpRequest, HttpResponse, Scope};
use chrono::{DateTime, Duration, Utc};
use common::model::draft::{Draft, DraftSummary};
use common::model::plan::Plan;
use common::requests::{CreateDraftRequest, DraftCreated, Pagination};
use log::{error, info, warn};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const API_PATH: &str = "/api/drafts";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("/history", get().to(history::process))
}

/// Fixed validity window of an issued access URL: one calendar day.
fn access_window() -> Duration {
    Duration::days(1)
}

/// Where a draft's artifact lives in blob storage. Derived from ids so the
/// refresher can re-sign URLs without storing the path on the record.
fn blob_path(user_id: &str, draft_id: &str) -> String {
    format!("{}/{}.docx", user_id, draft_id)
}

/// Timestamp-derived prefix plus a random suffix; uniqueness matters more
/// than format.
fn new_draft_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Coordinates one draft generation end to end over injected stores.
#[derive(Clone)]
pub struct DraftService {
    templates: Arc<dyn TemplateStore>,
    drafts: Arc<dyn DraftStore>,
    quotas: Arc<dyn QuotaStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DraftService {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        drafts: Arc<dyn DraftStore>,
        quotas: Arc<dyn QuotaStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        DraftService {
            templates,
            drafts,
            quotas,
            blobs,
        }
    }

    /// Runs the full generation sequence. Each step's failure short-circuits
    /// the rest; quota is consumed only as the final step, so a failed call
    /// is always safe to retry.
    pub fn create_draft(
        &self,
        user_id: &str,
        plan: Plan,
        req: &CreateDraftRequest,
    ) -> Result<DraftCreated, DraftError> {
        let today = Utc::now().date_naive();

        // Lazy upsert of the quota record, then the cheap cap check before
        // any template or storage work.
        let quota = self.quotas.get_or_create(user_id, plan, today)?;
        let cap = quota.plan.monthly_cap();
        if let Some(limit) = cap {
            if quota.drafts_used_this_month >= limit {
                return Err(DraftError::QuotaExceeded {
                    used: quota.drafts_used_this_month,
                    limit,
                });
            }
        }

        let template = self
            .templates
            .get_template(&req.template_id)?
            .filter(|t| t.active)
            .ok_or(DraftError::TemplateNotFound)?;

        let result = validation::validate(&template.variables, &req.variables);
        if !result.valid {
            return Err(DraftError::Validation(result.errors));
        }

        let binary = self
            .templates
            .get_binary(&template.id)?
            .ok_or(DraftError::TemplateNotFound)?;
        let output = merge::generate(&binary, &result.sanitized, &template.variables)?;

        let draft_id = new_draft_id();
        let path = blob_path(user_id, &draft_id);
        self.blobs.upload(&path, &output.bytes)?;
        let signed = self.blobs.signed_url(&path, access_window())?;

        let draft = Draft {
            id: draft_id.clone(),
            user_id: user_id.to_string(),
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            category_name: template.category_name.clone(),
            generated_file_url: signed.url.clone(),
            variables: output.variables,
            created_at: Utc::now(),
            expires_at: signed.expires_at.to_rfc3339(),
        };
        self.drafts.insert(&draft)?;

        // Atomic increment, the one cross-request mutual exclusion point.
        // Two concurrent requests at cap-1 must not both get past it.
        let (ok, used) = self.quotas.increment_if_below(user_id, cap, today)?;
        if !ok {
            if let Err(e) = self.drafts.delete(&draft.id) {
                error!("failed to remove draft {} after losing quota race: {}", draft.id, e);
            }
            warn!("orphaned blob {} after losing quota race for user {}", path, user_id);
            return Err(DraftError::QuotaExceeded {
                used,
                limit: cap.unwrap_or(used),
            });
        }

        info!(
            "draft {} generated for user {} ({} variables merged)",
            draft_id, user_id, output.metadata.variable_count
        );
        Ok(DraftCreated {
            draft_id,
            download_url: signed.url,
            expires_at: draft.expires_at,
        })
    }

    /// Returns one page of the user's drafts, reissuing lapsed access URLs
    /// for the stored blobs before the page is returned.
    pub fn list_history(
        &self,
        user_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<(Vec<DraftSummary>, Pagination), DraftError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(limit);

        let (mut drafts, total) = self.drafts.list_for_user(user_id, offset, limit)?;
        let now = Utc::now();
        for draft in &mut drafts {
            if !access_lapsed(&draft.expires_at, now) {
                continue;
            }
            let path = blob_path(&draft.user_id, &draft.id);
            let signed = self.blobs.signed_url(&path, access_window())?;
            let expires_at = signed.expires_at.to_rfc3339();
            self.drafts.update_access(&draft.id, &signed.url, &expires_at)?;
            draft.generated_file_url = signed.url;
            draft.expires_at = expires_at;
        }

        let total_pages = total.div_ceil(limit);
        Ok((
            drafts.into_iter().map(DraftSummary::from).collect(),
            Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        ))
    }
}

/// An unparsable expiry is treated as already lapsed, fail safe.
fn access_lapsed(expires_at: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(t) => t.with_timezone(&Utc) <= now,
        Err(_) => true,
    }
}

/// Caller identity as resolved by the auth collaborator in front of this
/// service.
pub(crate) struct Caller {
    pub user_id: String,
    pub plan: Plan,
}

pub(crate) fn caller_identity(req: &HttpRequest) -> Option<Caller> {
    let user_id = req
        .headers()
        .get("X-User-Id")?
        .to_str()
        .ok()?
        .trim()
        .to_string();
    if user_id.is_empty() {
        return None;
    }
    let plan = req
        .headers()
        .get("X-User-Plan")
        .and_then(|v| v.to_str().ok())
        .map(Plan::from_claim)
        .unwrap_or_default();
    Some(Caller { user_id, plan })
}

pub(crate) fn unauthenticated() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "error": { "code": "UNAUTHENTICATED", "message": "Missing caller identity" }
    }))
}

/// Maps the internal taxonomy to the external JSON envelope. The specific
/// cause of generation/storage failures stays in the server logs; clients
/// get a generic retry-prompting message.
pub(crate) fn error_response(err: &DraftError) -> HttpResponse {
    match err {
        DraftError::Validation(errors) => HttpResponse::BadRequest().json(json!({
            "error": { "code": "VALIDATION_ERROR", "details": errors }
        })),
        DraftError::QuotaExceeded { used, limit } => HttpResponse::PaymentRequired().json(json!({
            "error": {
                "code": "DRAFT_LIMIT_EXCEEDED",
                "details": { "used": used, "limit": limit }
            }
        })),
        DraftError::TemplateNotFound => HttpResponse::NotFound().json(json!({
            "error": { "code": "NOT_FOUND", "message": "Template not found" }
        })),
        DraftError::Generation(cause) => {
            error!("document generation failed: {}", cause);
            HttpResponse::InternalServerError().json(json!({
                "error": {
                    "code": "GENERATION_FAILED",
                    "message": "The document could not be generated. Please try again."
                }
            }))
        }
        DraftError::Storage(cause) => {
            error!("storage failure: {}", cause);
            HttpResponse::ServiceUnavailable().json(json!({
                "error": {
                    "code": "STORAGE_ERROR",
                    "message": "A temporary storage problem occurred. Please retry."
                }
            }))
        }
    }
}
