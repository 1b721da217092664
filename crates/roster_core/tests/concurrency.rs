use chrono::NaiveDate;
use roster_core::db::open_db;
use roster_core::{
    HistoryOperation, NewStudent, StudentId, StudentService, StudentServiceError, StudentUpdate,
};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 4;

fn dob() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
}

/// Runs `op` on `WRITERS` threads released together by a barrier.
fn race<T, F>(path: &Path, op: F) -> Vec<Result<T, StudentServiceError>>
where
    T: Send + 'static,
    F: Fn(&Path, usize) -> Result<T, StudentServiceError> + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|index| {
            let path = path.to_path_buf();
            let op = Arc::clone(&op);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                op(&path, index)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

fn seed(path: &Path, count: usize) -> Vec<StudentId> {
    let mut conn = open_db(path).unwrap();
    let mut service = StudentService::try_new(&mut conn).unwrap();
    (0..count)
        .map(|index| {
            let request = NewStudent::new(
                format!("student-{index}"),
                format!("student-{index}@test.com"),
                dob(),
            );
            service.create(None, request).unwrap().id
        })
        .collect()
}

fn create_from_own_connection(path: &Path, name: &str) -> Result<(), StudentServiceError> {
    let mut conn = open_db(path).unwrap();
    let mut service = StudentService::try_new(&mut conn).unwrap();
    service
        .create(None, NewStudent::new(name, "shared@test.com", dob()))
        .map(|_| ())
}

#[test]
fn concurrent_creates_with_same_email_commit_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    drop(open_db(&path).unwrap());

    let results = race(&path, |path, index| {
        create_from_own_connection(path, &format!("writer-{index}"))
    });

    let committed = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(StudentServiceError::EmailConflict(_))))
        .count();
    assert_eq!(committed, 1);
    assert_eq!(conflicts, WRITERS - 1);

    let mut conn = open_db(&path).unwrap();
    let service = StudentService::try_new(&mut conn).unwrap();
    assert_eq!(service.list_active().unwrap().len(), 1);
    assert_eq!(service.list_activity().unwrap().len(), 1);
}

#[test]
fn concurrent_soft_deletes_of_one_student_commit_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let id = seed(&path, 1)[0];

    let results = race(&path, move |path, _| {
        let mut conn = open_db(path).unwrap();
        let mut service = StudentService::try_new(&mut conn).unwrap();
        service.soft_delete(None, id)
    });

    let committed = results.iter().filter(|result| result.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|result| {
            matches!(
                result,
                Err(StudentServiceError::NotFoundOrAlreadyDeleted(other)) if *other == id
            )
        })
        .count();
    assert_eq!(committed, 1);
    assert_eq!(rejected, WRITERS - 1);

    let mut conn = open_db(&path).unwrap();
    let service = StudentService::try_new(&mut conn).unwrap();
    let history = service.get_history(id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation, HistoryOperation::Delete);
    assert_eq!(service.list_deleted().unwrap().len(), 1);
    // One CREATE from seeding plus the single winning DELETE.
    assert_eq!(service.list_activity().unwrap().len(), 2);
}

#[test]
fn concurrent_updates_to_one_email_commit_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let ids = Arc::new(seed(&path, WRITERS));

    let targets = Arc::clone(&ids);
    let results = race(&path, move |path, index| {
        let mut conn = open_db(path).unwrap();
        let mut service = StudentService::try_new(&mut conn).unwrap();
        service
            .update(None, targets[index], StudentUpdate::email("shared@test.com"))
            .map(|student| student.id)
    });

    let winners: Vec<_> = results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .collect();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(StudentServiceError::EmailConflict(_))))
        .count();
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, WRITERS - 1);

    let mut conn = open_db(&path).unwrap();
    let service = StudentService::try_new(&mut conn).unwrap();
    let owners: Vec<_> = service
        .list_active()
        .unwrap()
        .into_iter()
        .filter(|student| student.email == "shared@test.com")
        .map(|student| student.id)
        .collect();
    assert_eq!(owners, vec![*winners[0]]);
    for id in ids.iter().filter(|id| *id != winners[0]) {
        assert!(service.get_history(*id).unwrap().is_empty());
    }
    assert_eq!(service.list_activity().unwrap().len(), WRITERS + 1);
}
