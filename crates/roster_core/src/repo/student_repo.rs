//! Student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide identity, email and partition lookups over `students`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `find_by_email` ignores the deleted flag; emails stay reserved.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `delete_student` is irreversible and touches no other table.

use crate::db::DbError;
use crate::model::student::{Student, StudentId};
use crate::repo::schema::{bool_to_int, dob_to_db, parse_dob, parse_uuid};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    dob,
    deleted
FROM students";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by the student, history and activity stores.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(StudentId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted roster data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}; open it via db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store contract consumed by the lifecycle service.
pub trait StudentRepository {
    /// Inserts a new record carrying its freshly assigned identity.
    fn insert_student(&self, student: &Student) -> RepoResult<StudentId>;
    /// Inserts or updates a record by identity.
    fn save_student(&self, student: &Student) -> RepoResult<()>;
    /// Gets one record regardless of deleted state.
    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Gets one record only when it is not deleted.
    fn get_active_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Finds the record owning `email`, active or deleted.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>>;
    fn exists(&self, id: StudentId) -> RepoResult<bool>;
    fn list_active(&self) -> RepoResult<Vec<Student>>;
    fn list_deleted(&self) -> RepoResult<Vec<Student>>;
    /// Permanently removes one record.
    fn delete_student(&self, id: StudentId) -> RepoResult<()>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        crate::repo::ensure_roster_schema_ready(conn)?;
        Ok(Self::new(conn))
    }

    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, filter: &str, param: &str) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} {filter};"))?;
        let mut rows = stmt.query([param])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }
        Ok(None)
    }

    fn list_partition(&self, deleted: bool) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STUDENT_SELECT_SQL}
             WHERE deleted = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(deleted)])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn insert_student(&self, student: &Student) -> RepoResult<StudentId> {
        self.conn.execute(
            "INSERT INTO students (id, name, email, dob, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                student.id.to_string(),
                student.name.as_str(),
                student.email.as_str(),
                dob_to_db(student.dob),
                bool_to_int(student.deleted),
            ],
        )?;
        Ok(student.id)
    }

    fn save_student(&self, student: &Student) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO students (id, name, email, dob, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                dob = excluded.dob,
                deleted = excluded.deleted,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                student.id.to_string(),
                student.name.as_str(),
                student.email.as_str(),
                dob_to_db(student.dob),
                bool_to_int(student.deleted),
            ],
        )?;
        Ok(())
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.query_one("WHERE id = ?1", id.to_string().as_str())
    }

    fn get_active_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.query_one("WHERE id = ?1 AND deleted = 0", id.to_string().as_str())
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.query_one("WHERE email = ?1", email)
    }

    fn exists(&self, id: StudentId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_active(&self) -> RepoResult<Vec<Student>> {
        self.list_partition(false)
    }

    fn list_deleted(&self) -> RepoResult<Vec<Student>> {
        self.list_partition(true)
    }

    fn delete_student(&self, id: StudentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("id")?;
    let dob_text: String = row.get("dob")?;

    let deleted = match row.get::<_, i64>("deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid deleted value `{other}` in students.deleted"
            )));
        }
    };

    Ok(Student {
        id: parse_uuid(&id_text, "students.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        dob: parse_dob(&dob_text, "students.dob")?,
        deleted,
    })
}
