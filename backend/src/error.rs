//! Error taxonomy of the draft pipeline.
//!
//! The validator and merge engine return structured results; the orchestrator
//! translates them into these variants, and only the HTTP handlers turn them
//! into the external JSON envelope. Nothing below the handler layer builds
//! HTTP-shaped errors.

use crate::services::merge::MergeError;
use crate::stores::StoreError;
use common::model::validation::FieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DraftError {
    /// Per-field, user-correctable; always reported in full.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Terminal for the current period; carries usage data for the UI.
    #[error("monthly draft limit reached ({used}/{limit})")]
    QuotaExceeded { used: u32, limit: u32 },

    /// Template missing or inactive; inactive behaves as deleted here.
    #[error("template not found")]
    TemplateNotFound,

    /// Template could not be parsed or rendered; terminal for that template.
    #[error("document generation failed: {0}")]
    Generation(#[from] MergeError),

    /// Transient store failure; the whole request is safe to retry because
    /// quota is only consumed as the final step of a successful creation.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}
