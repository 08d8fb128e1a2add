//! SQLite-backed record stores.
//!
//! One store struct serves the template, draft, and quota traits against a
//! single database file. Connections are opened per operation against the
//! configured path, so the struct itself stays trivially `Send + Sync` and
//! can be shared across workers behind an `Arc`.
//!
//! Quota atomicity: `increment_if_below` runs inside an `IMMEDIATE`
//! transaction. SQLite serializes writers, so the read-modify-write of the
//! counter is mutually exclusive across concurrent requests without any
//! in-process locking.

use crate::stores::{DraftStore, QuotaStore, StoreError, TemplateStore};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use common::model::draft::Draft;
use common::model::plan::Plan;
use common::model::quota::QuotaRecord;
use common::model::template::Template;
use common::model::variable::VariableDefinition;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        SqliteStore {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        // Writers queue up instead of failing with SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Creates the tables on first run. Called once at startup.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS templates (
                 id            TEXT PRIMARY KEY,
                 name          TEXT NOT NULL,
                 category_name TEXT NOT NULL,
                 active        INTEGER NOT NULL DEFAULT 1,
                 variables     TEXT NOT NULL,
                 binary        BLOB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS drafts (
                 id                 TEXT PRIMARY KEY,
                 user_id            TEXT NOT NULL,
                 template_id        TEXT NOT NULL,
                 template_name      TEXT NOT NULL,
                 category_name      TEXT NOT NULL,
                 generated_file_url TEXT NOT NULL,
                 variables          TEXT NOT NULL,
                 created_at         TEXT NOT NULL,
                 expires_at         TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_drafts_user
                 ON drafts (user_id, created_at DESC);
             CREATE TABLE IF NOT EXISTS quotas (
                 user_id    TEXT PRIMARY KEY,
                 plan       TEXT NOT NULL,
                 drafts_used INTEGER NOT NULL,
                 reset_date TEXT NOT NULL
             );",
        )?;
        Ok(())
    }
}

fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad created_at '{}': {}", raw, e)))
}

impl TemplateStore for SqliteStore {
    fn get_template(&self, id: &str) -> Result<Option<Template>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, i64, String)> = conn
            .query_row(
                "SELECT id, name, category_name, active, variables
                 FROM templates WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, category_name, active, variables_json)) = row else {
            return Ok(None);
        };
        let variables: Vec<VariableDefinition> = serde_json::from_str(&variables_json)?;
        Ok(Some(Template {
            id,
            name,
            category_name,
            active: active != 0,
            variables,
        }))
    }

    fn get_binary(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn()?;
        let bytes = conn
            .query_row(
                "SELECT binary FROM templates WHERE id = ?1",
                params![id],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(bytes)
    }

    fn save_template(&self, template: &Template, binary: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let variables_json = serde_json::to_string(&template.variables)?;
        conn.execute(
            "INSERT OR REPLACE INTO templates (id, name, category_name, active, variables, binary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                template.id,
                template.name,
                template.category_name,
                template.active as i64,
                variables_json,
                binary,
            ],
        )?;
        Ok(())
    }
}

impl DraftStore for SqliteStore {
    fn insert(&self, draft: &Draft) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let variables_json = serde_json::to_string(&draft.variables)?;
        conn.execute(
            "INSERT INTO drafts (id, user_id, template_id, template_name, category_name,
                                 generated_file_url, variables, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                draft.id,
                draft.user_id,
                draft.template_id,
                draft.template_name,
                draft.category_name,
                draft.generated_file_url,
                variables_json,
                draft.created_at.to_rfc3339(),
                draft.expires_at,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM drafts WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn list_for_user(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<Draft>, u32), StoreError> {
        let conn = self.conn()?;
        let total: u32 = conn.query_row(
            "SELECT COUNT(*) FROM drafts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, template_id, template_name, category_name,
                    generated_file_url, variables, created_at, expires_at
             FROM drafts WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![user_id, limit, offset], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut drafts = Vec::new();
        for row in rows {
            let (id, user_id, template_id, template_name, category_name, url, vars, created, expires) =
                row?;
            drafts.push(Draft {
                id,
                user_id,
                template_id,
                template_name,
                category_name,
                generated_file_url: url,
                variables: serde_json::from_str::<BTreeMap<String, String>>(&vars)?,
                created_at: parse_created_at(&created)?,
                expires_at: expires,
            });
        }
        Ok((drafts, total))
    }

    fn update_access(&self, id: &str, url: &str, expires_at: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE drafts SET generated_file_url = ?1, expires_at = ?2 WHERE id = ?3",
            params![url, expires_at, id],
        )?;
        Ok(())
    }
}

/// First day of the month `today` falls in.
fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Whether a counter stamped with `reset_date` belongs to an earlier month
/// than `today`.
fn month_lapsed(reset_date: NaiveDate, today: NaiveDate) -> bool {
    (reset_date.year(), reset_date.month()) != (today.year(), today.month())
}

impl QuotaStore for SqliteStore {
    fn get_or_create(
        &self,
        user_id: &str,
        plan: Plan,
        today: NaiveDate,
    ) -> Result<QuotaRecord, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(String, u32, String)> = tx
            .query_row(
                "SELECT plan, drafts_used, reset_date FROM quotas WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let record = match row {
            None => {
                // First-time caller: seed a zero-usage record from the claims.
                let reset = month_start(today);
                tx.execute(
                    "INSERT INTO quotas (user_id, plan, drafts_used, reset_date)
                     VALUES (?1, ?2, 0, ?3)",
                    params![user_id, plan.as_str(), reset.to_string()],
                )?;
                QuotaRecord {
                    user_id: user_id.to_string(),
                    plan,
                    drafts_used_this_month: 0,
                    drafts_reset_date: reset,
                }
            }
            Some((stored_plan, used, reset_raw)) => {
                let stored_plan = Plan::from_claim(&stored_plan);
                let reset_date = reset_raw
                    .parse::<NaiveDate>()
                    .map_err(|e| StoreError::Corrupt(format!("bad reset_date: {}", e)))?;
                if month_lapsed(reset_date, today) {
                    let reset = month_start(today);
                    tx.execute(
                        "UPDATE quotas SET drafts_used = 0, reset_date = ?1 WHERE user_id = ?2",
                        params![reset.to_string(), user_id],
                    )?;
                    QuotaRecord {
                        user_id: user_id.to_string(),
                        plan: stored_plan,
                        drafts_used_this_month: 0,
                        drafts_reset_date: reset,
                    }
                } else {
                    QuotaRecord {
                        user_id: user_id.to_string(),
                        plan: stored_plan,
                        drafts_used_this_month: used,
                        drafts_reset_date: reset_date,
                    }
                }
            }
        };

        tx.commit()?;
        Ok(record)
    }

    fn increment_if_below(
        &self,
        user_id: &str,
        limit: Option<u32>,
        today: NaiveDate,
    ) -> Result<(bool, u32), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(u32, String)> = tx
            .query_row(
                "SELECT drafts_used, reset_date FROM quotas WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let used = match row {
            None => {
                // Should have been created by get_or_create; recover anyway.
                tx.execute(
                    "INSERT INTO quotas (user_id, plan, drafts_used, reset_date)
                     VALUES (?1, 'free', 0, ?2)",
                    params![user_id, month_start(today).to_string()],
                )?;
                0
            }
            Some((used, reset_raw)) => {
                let reset_date = reset_raw
                    .parse::<NaiveDate>()
                    .map_err(|e| StoreError::Corrupt(format!("bad reset_date: {}", e)))?;
                if month_lapsed(reset_date, today) {
                    tx.execute(
                        "UPDATE quotas SET drafts_used = 0, reset_date = ?1 WHERE user_id = ?2",
                        params![month_start(today).to_string(), user_id],
                    )?;
                    0
                } else {
                    used
                }
            }
        };

        if let Some(cap) = limit {
            if used >= cap {
                tx.commit()?;
                return Ok((false, used));
            }
        }

        tx.execute(
            "UPDATE quotas SET drafts_used = drafts_used + 1 WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.commit()?;
        Ok((true, used + 1))
    }
}
