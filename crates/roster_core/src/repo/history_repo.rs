//! History store contract and SQLite implementation.
//!
//! # Invariants
//! - Append-only; `student_history` triggers reject UPDATE and DELETE.
//! - Listing is most recent first; equal timestamps fall back to append order.

use crate::model::history::{HistoryOperation, StudentHistory};
use crate::model::student::StudentId;
use crate::repo::schema::{dob_to_db, parse_dob, parse_uuid};
use crate::repo::student_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub trait HistoryRepository {
    fn append_history(&self, entry: &StudentHistory) -> RepoResult<()>;
    /// Lists snapshots for one student, newest first.
    fn list_history(&self, student_id: StudentId) -> RepoResult<Vec<StudentHistory>>;
}

/// SQLite-backed history store.
pub struct SqliteHistoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        crate::repo::ensure_roster_schema_ready(conn)?;
        Ok(Self::new(conn))
    }

    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HistoryRepository for SqliteHistoryRepository<'_> {
    fn append_history(&self, entry: &StudentHistory) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO student_history (
                history_id,
                student_id,
                name,
                email,
                dob,
                operation,
                changed_at,
                changed_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.history_id.to_string(),
                entry.student_id.to_string(),
                entry.name.as_str(),
                entry.email.as_str(),
                dob_to_db(entry.dob),
                entry.operation.as_str(),
                entry.changed_at,
                entry.changed_by.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_history(&self, student_id: StudentId) -> RepoResult<Vec<StudentHistory>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                history_id,
                student_id,
                name,
                email,
                dob,
                operation,
                changed_at,
                changed_by
             FROM student_history
             WHERE student_id = ?1
             ORDER BY changed_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([student_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_history_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_history_row(row: &Row<'_>) -> RepoResult<StudentHistory> {
    let history_id: String = row.get("history_id")?;
    let student_id: String = row.get("student_id")?;
    let dob: String = row.get("dob")?;
    let operation_text: String = row.get("operation")?;
    let operation = HistoryOperation::parse(&operation_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid operation `{operation_text}` in student_history.operation"
        ))
    })?;

    Ok(StudentHistory {
        history_id: parse_uuid(&history_id, "student_history.history_id")?,
        student_id: parse_uuid(&student_id, "student_history.student_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        dob: parse_dob(&dob, "student_history.dob")?,
        operation,
        changed_at: row.get("changed_at")?,
        changed_by: row.get("changed_by")?,
    })
}
