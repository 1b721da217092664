//! Field-level history snapshots.
//!
//! # Invariants
//! - Entries are built only from a `StudentSnapshot` captured before mutation.
//! - `student_id` is a reference; hard delete leaves entries in place.

use crate::context::{Actor, EpochMillis};
use crate::model::student::{StudentId, StudentSnapshot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation that caused a history snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryOperation {
    Update,
    Delete,
}

impl HistoryOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Immutable snapshot of a student's fields at the moment of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentHistory {
    pub history_id: Uuid,
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
    pub operation: HistoryOperation,
    /// Unix epoch milliseconds.
    pub changed_at: EpochMillis,
    pub changed_by: String,
}

impl StudentHistory {
    /// Builds a history entry from a pre-mutation snapshot.
    pub fn from_snapshot(
        snapshot: StudentSnapshot,
        operation: HistoryOperation,
        changed_at: EpochMillis,
        changed_by: &Actor,
    ) -> Self {
        Self {
            history_id: Uuid::new_v4(),
            student_id: snapshot.student_id,
            name: snapshot.name,
            email: snapshot.email,
            dob: snapshot.dob,
            operation,
            changed_at,
            changed_by: changed_by.as_str().to_string(),
        }
    }
}
