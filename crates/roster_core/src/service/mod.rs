//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into lifecycle-level APIs.
//! - Keep transport layers decoupled from storage details.

pub mod student_service;
