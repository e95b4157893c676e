//! Domain model for tasks, projects and accounts.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one item shape for both the task and project collections.
//!
//! # Invariants
//! - Every work item is identified by a stable `WorkItemId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod user;
pub mod work_item;
