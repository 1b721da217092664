//! Schema readiness checks and column codecs shared by SQLite repositories.

use crate::db::migrations::{current_user_version, latest_version};
use crate::repo::student_repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

const DOB_FORMAT: &str = "%Y-%m-%d";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("students", &["id", "name", "email", "dob", "deleted"]),
    (
        "student_history",
        &[
            "history_id",
            "student_id",
            "name",
            "email",
            "dob",
            "operation",
            "changed_at",
            "changed_by",
        ],
    ),
    (
        "activity_log",
        &["log_id", "action", "student_id", "actor", "timestamp"],
    ),
];

/// Verifies that `conn` has been migrated and carries every roster table.
///
/// # Errors
/// - `UninitializedConnection` when migrations have not been applied.
/// - `MissingRequiredTable` / `MissingRequiredColumn` for a drifted schema.
pub fn ensure_roster_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn dob_to_db(dob: NaiveDate) -> String {
    dob.format(DOB_FORMAT).to_string()
}

pub(crate) fn parse_dob(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DOB_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date value `{value}` in {column}")))
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{dob_to_db, parse_dob, parse_uuid};
    use crate::repo::student_repo::RepoError;
    use chrono::NaiveDate;

    #[test]
    fn dob_codec_uses_iso_dates() {
        let dob = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(dob_to_db(dob), "1999-12-31");
        assert_eq!(parse_dob("1999-12-31", "students.dob").unwrap(), dob);
    }

    #[test]
    fn malformed_values_surface_as_invalid_data() {
        let err = parse_dob("31/12/1999", "students.dob").unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("students.dob")));
        assert!(matches!(
            parse_uuid("not-a-uuid", "students.id"),
            Err(RepoError::InvalidData(_))
        ));
    }
}
