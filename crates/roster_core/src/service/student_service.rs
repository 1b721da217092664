//! Student lifecycle service.
//!
//! # Responsibility
//! - Enforce email uniqueness and the `Active ⇄ Deleted → Purged` lifecycle.
//! - Order writes across record, history and activity log inside one
//!   `UnitOfWork` per mutation.
//!
//! # Invariants
//! - Every precondition is checked before the first write; a rejected call
//!   leaves no partial state.
//! - History entries are built from a snapshot taken before mutation.
//! - `update` that changes nothing writes nothing.
//! - `hard_delete` bypasses history and activity entirely.
//! - Storage errors are propagated unchanged and never retried.

use crate::context::{Actor, Clock, EpochMillis, SystemClock};
use crate::db::{DbError, UnitOfWork};
use crate::model::activity::{ActivityAction, ActivityLog};
use crate::model::history::{HistoryOperation, StudentHistory};
use crate::model::student::{Student, StudentId};
use crate::repo::activity_repo::{ActivityLogRepository, SqliteActivityLogRepository};
use crate::repo::ensure_roster_schema_ready;
use crate::repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
use crate::repo::student_repo::{RepoError, SqliteStudentRepository, StudentRepository};
use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ServiceResult<T> = Result<T, StudentServiceError>;

/// Business and storage errors returned by lifecycle operations.
#[derive(Debug)]
pub enum StudentServiceError {
    /// Another record, active or deleted, already owns this email.
    EmailConflict(String),
    /// No record with this id (for `update`: no active record).
    NotFound(StudentId),
    /// Soft delete target is absent or already deleted.
    NotFoundOrAlreadyDeleted(StudentId),
    /// Restore target is not currently deleted.
    NotDeleted(StudentId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl StudentServiceError {
    /// Stable machine-readable code for logs and transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmailConflict(_) => "email_conflict",
            Self::NotFound(_) => "not_found",
            Self::NotFoundOrAlreadyDeleted(_) => "not_found_or_already_deleted",
            Self::NotDeleted(_) => "not_deleted",
            Self::Repo(_) => "storage_failure",
        }
    }
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailConflict(email) => write!(f, "email already exists: `{email}`"),
            Self::NotFound(id) => write!(f, "student with id {id} does not exist"),
            Self::NotFoundOrAlreadyDeleted(id) => write!(
                f,
                "student with id {id} does not exist or is already deleted"
            ),
            Self::NotDeleted(id) => write!(f, "student with id {id} is not deleted"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for StudentServiceError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

/// Request model for registering a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
}

impl NewStudent {
    pub fn new(name: impl Into<String>, email: impl Into<String>, dob: NaiveDate) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            dob,
        }
    }
}

/// Partial update request. `None`, blank and unchanged values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl StudentUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: None,
        }
    }

    pub fn email(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: Some(email.into()),
        }
    }
}

/// Who and when, resolved once per mutating call.
#[derive(Debug, Clone, Copy)]
struct Stamp<'a> {
    actor: &'a Actor,
    at: EpochMillis,
}

#[derive(Debug)]
enum UpdateOutcome {
    Changed(Student),
    Unchanged(Student),
}

/// Lifecycle service over a migrated SQLite connection.
pub struct StudentService<'conn, C: Clock = SystemClock> {
    conn: &'conn mut Connection,
    clock: C,
    system_actor: Actor,
}

impl<'conn> StudentService<'conn, SystemClock> {
    /// Creates a service with the wall clock and the default system actor.
    pub fn try_new(conn: &'conn mut Connection) -> ServiceResult<Self> {
        Self::with_clock(conn, SystemClock, Actor::system())
    }
}

impl<'conn, C: Clock> StudentService<'conn, C> {
    /// Creates a service with an explicit clock and fallback actor.
    ///
    /// # Errors
    /// - Returns `Repo` when the connection has not been migrated.
    pub fn with_clock(
        conn: &'conn mut Connection,
        clock: C,
        system_actor: Actor,
    ) -> ServiceResult<Self> {
        ensure_roster_schema_ready(conn)?;
        Ok(Self {
            conn,
            clock,
            system_actor,
        })
    }

    /// Registers a new active student and logs `CREATE`.
    ///
    /// # Errors
    /// - `EmailConflict` when any record already uses `request.email`.
    pub fn create(
        &mut self,
        actor: Option<&Actor>,
        request: NewStudent,
    ) -> ServiceResult<Student> {
        let started_at = Instant::now();
        let result = self.mutate("student_create", actor, |work, stamp| {
            create_student(&work.students(), &work.activity(), stamp, request)
                .map(|student| (student, true))
        });
        log_outcome(
            "student_create",
            started_at,
            result.as_ref().ok().map(|student| student.id),
            &result,
        );
        result
    }

    /// Applies a partial update to an active student.
    ///
    /// Returns the resulting record; when nothing changed, the stored record
    /// is returned untouched and no history or activity is written.
    ///
    /// # Errors
    /// - `NotFound` when no active record has `id`.
    /// - `EmailConflict` when a changed email is owned by another record.
    pub fn update(
        &mut self,
        actor: Option<&Actor>,
        id: StudentId,
        changes: StudentUpdate,
    ) -> ServiceResult<Student> {
        let started_at = Instant::now();
        let result = self.mutate("student_update", actor, |work, stamp| {
            let outcome = update_student(
                &work.students(),
                &work.history(),
                &work.activity(),
                stamp,
                id,
                &changes,
            )?;
            Ok(match outcome {
                UpdateOutcome::Changed(student) => (student, true),
                UpdateOutcome::Unchanged(student) => (student, false),
            })
        });
        log_outcome("student_update", started_at, Some(id), &result);
        result
    }

    /// Soft-deletes an active student, recording a `DELETE` snapshot.
    ///
    /// # Errors
    /// - `NotFoundOrAlreadyDeleted` unless an active record has `id`.
    pub fn soft_delete(&mut self, actor: Option<&Actor>, id: StudentId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.mutate("student_soft_delete", actor, |work, stamp| {
            soft_delete_student(&work.students(), &work.history(), &work.activity(), stamp, id)
                .map(|()| ((), true))
        });
        log_outcome("student_soft_delete", started_at, Some(id), &result);
        result
    }

    /// Brings a soft-deleted student back to the active partition.
    ///
    /// Logs `RESTORE`; writes no history snapshot.
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`.
    /// - `NotDeleted` when the record is active.
    pub fn restore(&mut self, actor: Option<&Actor>, id: StudentId) -> ServiceResult<Student> {
        let started_at = Instant::now();
        let result = self.mutate("student_restore", actor, |work, stamp| {
            restore_student(&work.students(), &work.activity(), stamp, id)
                .map(|student| (student, true))
        });
        log_outcome("student_restore", started_at, Some(id), &result);
        result
    }

    /// Permanently removes a student, active or deleted.
    ///
    /// Privileged cleanup path: unattributed, no history or activity entry is
    /// written and existing entries for `id` are left as they are.
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`.
    pub fn hard_delete(&mut self, id: StudentId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = purge_student(self.conn, id);
        log_outcome("student_hard_delete", started_at, Some(id), &result);
        result
    }

    /// Gets one student regardless of deleted state.
    pub fn get_student(&self, id: StudentId) -> ServiceResult<Option<Student>> {
        Ok(self.students().get_student(id)?)
    }

    pub fn list_active(&self) -> ServiceResult<Vec<Student>> {
        Ok(self.students().list_active()?)
    }

    pub fn list_deleted(&self) -> ServiceResult<Vec<Student>> {
        Ok(self.students().list_deleted()?)
    }

    /// History snapshots for `id`, newest first. Unknown ids yield an empty list.
    pub fn get_history(&self, id: StudentId) -> ServiceResult<Vec<StudentHistory>> {
        Ok(SqliteHistoryRepository::new(&*self.conn).list_history(id)?)
    }

    /// Full activity log in append order.
    pub fn list_activity(&self) -> ServiceResult<Vec<ActivityLog>> {
        Ok(SqliteActivityLogRepository::new(&*self.conn).list_activity()?)
    }

    fn students(&self) -> SqliteStudentRepository<'_> {
        SqliteStudentRepository::new(&*self.conn)
    }

    /// Runs `apply` inside one unit of work.
    ///
    /// `apply` returns the value plus whether anything was written; the unit
    /// of work commits only in that case. Any error drops it uncommitted.
    fn mutate<T>(
        &mut self,
        operation: &'static str,
        actor: Option<&Actor>,
        apply: impl FnOnce(&UnitOfWork<'_>, Stamp<'_>) -> ServiceResult<(T, bool)>,
    ) -> ServiceResult<T> {
        let actor = actor.unwrap_or(&self.system_actor);
        let work = UnitOfWork::begin(self.conn, operation)?;
        let stamp = Stamp {
            actor,
            at: self.clock.now_ms(),
        };

        let (value, wrote) = apply(&work, stamp)?;
        if wrote {
            work.commit()?;
        } else {
            work.rollback()?;
        }
        Ok(value)
    }
}

fn create_student<S, A>(
    students: &S,
    activity: &A,
    stamp: Stamp<'_>,
    request: NewStudent,
) -> ServiceResult<Student>
where
    S: StudentRepository + ?Sized,
    A: ActivityLogRepository + ?Sized,
{
    if students.find_by_email(&request.email)?.is_some() {
        return Err(StudentServiceError::EmailConflict(request.email));
    }

    let student = Student::new(request.name, request.email, request.dob);
    students.insert_student(&student)?;
    activity.append_activity(&ActivityLog::new(
        ActivityAction::Create,
        student.id,
        stamp.actor,
        stamp.at,
    ))?;
    Ok(student)
}

fn update_student<S, H, A>(
    students: &S,
    history: &H,
    activity: &A,
    stamp: Stamp<'_>,
    id: StudentId,
    changes: &StudentUpdate,
) -> ServiceResult<UpdateOutcome>
where
    S: StudentRepository + ?Sized,
    H: HistoryRepository + ?Sized,
    A: ActivityLogRepository + ?Sized,
{
    let current = students
        .get_active_student(id)?
        .ok_or(StudentServiceError::NotFound(id))?;

    let new_name = effective_change(changes.name.as_deref(), &current.name);
    let new_email = effective_change(changes.email.as_deref(), &current.email);

    if let Some(email) = new_email {
        if students.find_by_email(email)?.is_some() {
            return Err(StudentServiceError::EmailConflict(email.to_string()));
        }
    }

    if new_name.is_none() && new_email.is_none() {
        return Ok(UpdateOutcome::Unchanged(current));
    }

    let before = current.snapshot();
    let mut updated = current;
    if let Some(name) = new_name {
        updated.name = name.to_string();
    }
    if let Some(email) = new_email {
        updated.email = email.to_string();
    }

    history.append_history(&StudentHistory::from_snapshot(
        before,
        HistoryOperation::Update,
        stamp.at,
        stamp.actor,
    ))?;
    students.save_student(&updated)?;
    activity.append_activity(&ActivityLog::new(
        ActivityAction::Update,
        id,
        stamp.actor,
        stamp.at,
    ))?;
    Ok(UpdateOutcome::Changed(updated))
}

fn soft_delete_student<S, H, A>(
    students: &S,
    history: &H,
    activity: &A,
    stamp: Stamp<'_>,
    id: StudentId,
) -> ServiceResult<()>
where
    S: StudentRepository + ?Sized,
    H: HistoryRepository + ?Sized,
    A: ActivityLogRepository + ?Sized,
{
    let mut student = students
        .get_active_student(id)?
        .ok_or(StudentServiceError::NotFoundOrAlreadyDeleted(id))?;

    history.append_history(&StudentHistory::from_snapshot(
        student.snapshot(),
        HistoryOperation::Delete,
        stamp.at,
        stamp.actor,
    ))?;
    student.soft_delete();
    students.save_student(&student)?;
    activity.append_activity(&ActivityLog::new(
        ActivityAction::Delete,
        id,
        stamp.actor,
        stamp.at,
    ))?;
    Ok(())
}

fn restore_student<S, A>(
    students: &S,
    activity: &A,
    stamp: Stamp<'_>,
    id: StudentId,
) -> ServiceResult<Student>
where
    S: StudentRepository + ?Sized,
    A: ActivityLogRepository + ?Sized,
{
    let mut student = students
        .get_student(id)?
        .ok_or(StudentServiceError::NotFound(id))?;
    if student.is_active() {
        return Err(StudentServiceError::NotDeleted(id));
    }

    student.restore();
    students.save_student(&student)?;
    activity.append_activity(&ActivityLog::new(
        ActivityAction::Restore,
        id,
        stamp.actor,
        stamp.at,
    ))?;
    Ok(student)
}

fn purge_student(conn: &mut Connection, id: StudentId) -> ServiceResult<()> {
    let work = UnitOfWork::begin(conn, "student_hard_delete")?;
    hard_delete_student(&work.students(), id)?;
    work.commit()?;
    Ok(())
}

fn hard_delete_student<S>(students: &S, id: StudentId) -> ServiceResult<()>
where
    S: StudentRepository + ?Sized,
{
    if !students.exists(id)? {
        return Err(StudentServiceError::NotFound(id));
    }
    students.delete_student(id)?;
    Ok(())
}

/// Returns `candidate` only when it is non-blank and differs from `current`.
fn effective_change<'a>(candidate: Option<&'a str>, current: &str) -> Option<&'a str> {
    candidate.filter(|value| !value.trim().is_empty() && *value != current)
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    student_id: Option<StudentId>,
    result: &ServiceResult<T>,
) {
    let student_id = student_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok student_id={student_id} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(StudentServiceError::Repo(err)) => warn!(
            "event={event} module=service status=error student_id={student_id} duration_ms={} error_code=storage_failure error={err}",
            started_at.elapsed().as_millis()
        ),
        // Business rejections carry user data (emails); log the code only.
        Err(err) => info!(
            "event={event} module=service status=rejected student_id={student_id} duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        effective_change, update_student, Stamp, StudentServiceError, StudentUpdate,
        UpdateOutcome,
    };
    use crate::context::Actor;
    use crate::db::{open_db_in_memory, UnitOfWork};
    use crate::model::activity::ActivityLog;
    use crate::model::student::Student;
    use crate::repo::activity_repo::ActivityLogRepository;
    use crate::repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
    use crate::repo::student_repo::{
        RepoError, RepoResult, SqliteStudentRepository, StudentRepository,
    };
    use chrono::NaiveDate;

    struct FailingActivityLog;

    impl ActivityLogRepository for FailingActivityLog {
        fn append_activity(&self, _entry: &ActivityLog) -> RepoResult<()> {
            Err(RepoError::InvalidData("injected activity failure".to_string()))
        }

        fn list_activity(&self) -> RepoResult<Vec<ActivityLog>> {
            Ok(Vec::new())
        }
    }

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(2001, 2, 3).unwrap()
    }

    #[test]
    fn effective_change_ignores_none_blank_and_equal_values() {
        assert_eq!(effective_change(None, "Ada"), None);
        assert_eq!(effective_change(Some(""), "Ada"), None);
        assert_eq!(effective_change(Some("   "), "Ada"), None);
        assert_eq!(effective_change(Some("Ada"), "Ada"), None);
        assert_eq!(effective_change(Some("Grace"), "Ada"), Some("Grace"));
    }

    #[test]
    fn failure_after_history_write_rolls_back_whole_unit_of_work() {
        let mut conn = open_db_in_memory().unwrap();
        let student = Student::new("Ada", "ada@example.com", dob());
        SqliteStudentRepository::new(&conn)
            .insert_student(&student)
            .unwrap();

        let actor = Actor::system();
        {
            let work = UnitOfWork::begin(&mut conn, "test_update").unwrap();
            let result = update_student(
                &work.students(),
                &work.history(),
                &FailingActivityLog,
                Stamp {
                    actor: &actor,
                    at: 42,
                },
                student.id,
                &StudentUpdate::name("Grace"),
            );
            assert!(matches!(result, Err(StudentServiceError::Repo(_))));
        }

        let stored = SqliteStudentRepository::new(&conn)
            .get_student(student.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Ada");
        let history = SqliteHistoryRepository::new(&conn)
            .list_history(student.id)
            .unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn update_snapshot_holds_pre_mutation_values() {
        let mut conn = open_db_in_memory().unwrap();
        let student = Student::new("Ada", "ada@example.com", dob());
        SqliteStudentRepository::new(&conn)
            .insert_student(&student)
            .unwrap();

        let actor = Actor::new("registrar").unwrap();
        let work = UnitOfWork::begin(&mut conn, "test_update").unwrap();
        let outcome = update_student(
            &work.students(),
            &work.history(),
            &work.activity(),
            Stamp {
                actor: &actor,
                at: 7,
            },
            student.id,
            &StudentUpdate {
                name: Some("Grace".to_string()),
                email: Some("grace@example.com".to_string()),
            },
        )
        .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Changed(ref s) if s.name == "Grace"));

        let history = work.history().list_history(student.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "Ada");
        assert_eq!(history[0].email, "ada@example.com");
        assert_eq!(history[0].changed_by, "registrar");
        assert_eq!(history[0].changed_at, 7);
        work.commit().unwrap();
    }
}
