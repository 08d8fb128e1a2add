use crate::model::plan::Plan;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user monthly usage counter.
///
/// `drafts_reset_date` is the first day of the month the counter applies to;
/// when the wall-clock month advances past it the counter is reset on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRecord {
    pub user_id: String,
    pub plan: Plan,
    pub drafts_used_this_month: u32,
    pub drafts_reset_date: NaiveDate,
}
