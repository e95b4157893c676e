//! Dashboard statistics.
//!
//! Aggregates are recomputed from a fresh snapshot on every call; nothing is
//! cached between calls.

use crate::model::user::UserId;
use crate::model::work_item::ItemKind;
use crate::productivity::ProductivitySummary;
use crate::repo::work_item_repo::WorkItemRepository;
use crate::service::ServiceResult;
use log::debug;

pub struct StatsService<R: WorkItemRepository> {
    repo: R,
}

impl<R: WorkItemRepository> StatsService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Per-kind totals and the overall completed percentage for `owner`.
    pub fn dashboard(&self, owner: UserId) -> ServiceResult<ProductivitySummary> {
        let tasks = self.repo.list_by_owner(owner, ItemKind::Task)?;
        let projects = self.repo.list_by_owner(owner, ItemKind::Project)?;
        let summary = ProductivitySummary::from_items(&tasks, &projects);
        debug!(
            "event=stats_dashboard module=service status=ok total={} completed={} percentage={}",
            summary.total_items(),
            summary.completed_items(),
            summary.productivity_percentage
        );
        Ok(summary)
    }

    pub fn productivity_percentage(&self, owner: UserId) -> ServiceResult<u8> {
        Ok(self.dashboard(owner)?.productivity_percentage)
    }
}
