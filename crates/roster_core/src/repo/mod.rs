//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store contracts the lifecycle service consumes.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories never open their own transactions; they run inside the
//!   caller's `UnitOfWork` (or autocommit for pure reads).
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors, and never retry.
//! - History and activity contracts are append-only: no update or delete.

pub mod activity_repo;
pub mod history_repo;
mod schema;
pub mod student_repo;

pub use schema::ensure_roster_schema_ready;
