//! Storage abstractions for the draft pipeline.
//!
//! The orchestrator only ever talks to these traits; the concrete backends
//! (SQLite for records, the local filesystem for blobs) are constructed in
//! `main.rs` and injected at startup. All operations are synchronous and are
//! expected to run off the async runtime via `web::block`.

mod blob;
mod sqlite;

pub use blob::FsBlobStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::model::draft::Draft;
use common::model::plan::Plan;
use common::model::quota::QuotaRecord;
use common::model::template::Template;
use thiserror::Error;

/// Failure in a record or blob store. Transient from the caller's point of
/// view: quota is only consumed at the very end of a successful creation, so
/// retrying the whole request after one of these is always safe.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("blob i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Read access to templates and their document binaries.
pub trait TemplateStore: Send + Sync {
    /// Fetches a template's metadata and variable schema, active or not.
    fn get_template(&self, id: &str) -> Result<Option<Template>, StoreError>;

    /// Fetches the raw document binary for a template.
    fn get_binary(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Upserts a template and its binary. Template CRUD has no HTTP surface
    /// here; this exists for seeding and tests.
    fn save_template(&self, template: &Template, binary: &[u8]) -> Result<(), StoreError>;
}

/// Persistence for generated draft records.
pub trait DraftStore: Send + Sync {
    fn insert(&self, draft: &Draft) -> Result<(), StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Returns one page of a user's drafts, newest first, plus the total
    /// count across all pages.
    fn list_for_user(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<Draft>, u32), StoreError>;

    /// Rewrites the access URL and expiry of an existing draft. The only
    /// mutation a draft ever sees after creation.
    fn update_access(&self, id: &str, url: &str, expires_at: &str) -> Result<(), StoreError>;
}

/// Atomic per-user monthly usage counter.
pub trait QuotaStore: Send + Sync {
    /// Loads the user's quota record, lazily creating a zero-usage one for
    /// first-time callers and rolling the counter over when the wall-clock
    /// month has advanced past the stored reset date.
    fn get_or_create(
        &self,
        user_id: &str,
        plan: Plan,
        today: NaiveDate,
    ) -> Result<QuotaRecord, StoreError>;

    /// Increments the usage counter by one iff it is currently below
    /// `limit`, as a single atomic read-modify-write. Returns whether the
    /// increment happened and the counter value afterwards. `None` means no
    /// cap (the increment always happens).
    fn increment_if_below(
        &self,
        user_id: &str,
        limit: Option<u32>,
        today: NaiveDate,
    ) -> Result<(bool, u32), StoreError>;
}

/// A freshly issued time-boxed access URL.
#[derive(Debug, Clone)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Blob storage plus signed-URL issuance for the stored artifacts.
pub trait BlobStore: Send + Sync {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Issues a time-boxed access URL for an already-stored blob.
    fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, StoreError>;

    /// Reads a stored blob back; `None` if it does not exist.
    fn open(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Checks a presented URL signature against `path` and `expires`.
    fn verify(&self, path: &str, expires: i64, sig: &str) -> bool;
}
