//! Core domain logic for the student roster.
//! This crate is the single source of truth for lifecycle invariants.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::RosterConfig;
pub use context::{Actor, Clock, EpochMillis, ManualClock, SystemClock, DEFAULT_SYSTEM_ACTOR};
pub use db::{open_db, open_db_in_memory, DbError, UnitOfWork};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::activity::{ActivityAction, ActivityLog};
pub use model::history::{HistoryOperation, StudentHistory};
pub use model::student::{Student, StudentId, StudentSnapshot};
pub use repo::activity_repo::{ActivityLogRepository, SqliteActivityLogRepository};
pub use repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use service::student_service::{
    NewStudent, ServiceResult, StudentService, StudentServiceError, StudentUpdate,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
