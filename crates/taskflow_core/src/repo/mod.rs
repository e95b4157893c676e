//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence contract consumed by services.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Missing targets on update/delete are reported as `WriteOutcome::Missing`,
//!   never as errors.

pub mod work_item_repo;
