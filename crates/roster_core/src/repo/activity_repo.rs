//! Activity log contract and SQLite implementation.
//!
//! # Invariants
//! - Append-only; `activity_log` triggers reject UPDATE and DELETE.
//! - `list_activity` returns entries in append order.

use crate::model::activity::{ActivityAction, ActivityLog};
use crate::repo::schema::parse_uuid;
use crate::repo::student_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub trait ActivityLogRepository {
    fn append_activity(&self, entry: &ActivityLog) -> RepoResult<()>;
    fn list_activity(&self) -> RepoResult<Vec<ActivityLog>>;
}

/// SQLite-backed activity log.
pub struct SqliteActivityLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityLogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        crate::repo::ensure_roster_schema_ready(conn)?;
        Ok(Self::new(conn))
    }

    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ActivityLogRepository for SqliteActivityLogRepository<'_> {
    fn append_activity(&self, entry: &ActivityLog) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO activity_log (log_id, action, student_id, actor, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                entry.log_id.to_string(),
                entry.action.as_str(),
                entry.student_id.to_string(),
                entry.actor.as_str(),
                entry.timestamp,
            ],
        )?;
        Ok(())
    }

    fn list_activity(&self) -> RepoResult<Vec<ActivityLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT log_id, action, student_id, actor, timestamp
             FROM activity_log
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_activity_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<ActivityLog> {
    let log_id: String = row.get("log_id")?;
    let student_id: String = row.get("student_id")?;
    let action_text: String = row.get("action")?;
    let action = ActivityAction::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid action `{action_text}` in activity_log.action"))
    })?;

    Ok(ActivityLog {
        log_id: parse_uuid(&log_id, "activity_log.log_id")?,
        action,
        student_id: parse_uuid(&student_id, "activity_log.student_id")?,
        actor: row.get("actor")?,
        timestamp: row.get("timestamp")?,
    })
}
