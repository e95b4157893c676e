//! Core domain logic for TaskFlow.
//! This crate is the single source of truth for completion and productivity
//! invariants.

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod productivity;
pub mod repo;
pub mod service;
pub mod session;

pub use config::CoreConfig;
pub use identity::{AuthError, AuthResult, IdentityProvider, SqliteIdentityProvider};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::user::{ProfileFields, UserId, UserIdentity, UserProfile};
pub use model::work_item::{
    CompletionState, ItemKind, ItemValidationError, NewWorkItem, Priority, ProjectDetails,
    WorkItem, WorkItemEdit, WorkItemId,
};
pub use productivity::{
    apply_progress_update, compute_progress_percentage, is_overdue, partition_by_completion,
    toggle_completion, ProductivitySummary, TaskCounts,
};
pub use repo::work_item_repo::{
    RepoError, RepoResult, SqliteWorkItemRepository, WorkItemPatch, WorkItemRepository,
    WriteOutcome,
};
pub use service::stats_service::StatsService;
pub use service::work_item_service::{ItemUpdate, WorkItemService};
pub use service::{ServiceError, ServiceResult};
pub use session::{Session, SubscriptionId};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
