//! Student domain model.
//!
//! # Responsibility
//! - Define the canonical student record.
//! - Provide soft-delete/restore helpers and pre-mutation snapshots.
//!
//! # Invariants
//! - `id` is assigned once on creation and never reused.
//! - `deleted` is the source of truth for the active/deleted partition.
//! - `email` is unique across all records; enforced by the service and by a
//!   storage-level `UNIQUE` constraint.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a student record.
pub type StudentId = Uuid;

/// Canonical student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
    /// Soft delete flag. Deleted records keep their email reserved.
    pub deleted: bool,
}

impl Student {
    /// Creates an active student with a freshly generated ID.
    pub fn new(name: impl Into<String>, email: impl Into<String>, dob: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            dob,
            deleted: false,
        }
    }

    /// Marks this student as softly deleted.
    pub fn soft_delete(&mut self) {
        self.deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.deleted = false;
    }

    /// Returns whether this student belongs to the active partition.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Captures the current field values as an immutable snapshot.
    ///
    /// Must be taken before any field is changed when the snapshot feeds a
    /// history entry.
    pub fn snapshot(&self) -> StudentSnapshot {
        StudentSnapshot {
            student_id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            dob: self.dob,
        }
    }
}

/// Field values of a student at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSnapshot {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
}
