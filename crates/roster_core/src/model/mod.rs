//! Roster domain model.
//!
//! # Responsibility
//! - Define the student record and its two audit shapes.
//! - Keep lifecycle flag helpers next to the data they guard.
//!
//! # Invariants
//! - Every student is identified by a stable `StudentId`.
//! - History and activity entries are immutable once built.

pub mod activity;
pub mod history;
pub mod student;
