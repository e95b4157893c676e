//! Task and project use-case service.
//!
//! # Responsibility
//! - Create, list, edit and delete tasks and projects for one owner.
//! - Run progress updates and completion toggles through the productivity
//!   rules and persist only the resulting field changes.
//!
//! # Invariants
//! - Every transition is confirmed by storage before the new item is
//!   returned; the returned item is a read-back, not the in-memory copy.
//! - Missing targets yield `ItemUpdate::Missing`, never an error.

use crate::model::user::UserId;
use crate::model::work_item::{ItemKind, NewWorkItem, WorkItem, WorkItemEdit, WorkItemId};
use crate::productivity::{
    apply_progress_update, is_due_today, partition_by_completion, toggle_completion,
};
use crate::repo::work_item_repo::{WorkItemPatch, WorkItemRepository, WriteOutcome};
use crate::service::{ServiceError, ServiceResult};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};

/// Outcome of a transition addressed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemUpdate {
    /// Stored state after the write.
    Applied(WorkItem),
    Missing,
}

impl ItemUpdate {
    pub fn into_item(self) -> Option<WorkItem> {
        match self {
            Self::Applied(item) => Some(item),
            Self::Missing => None,
        }
    }
}

/// Use-case service over a work item repository.
pub struct WorkItemService<R: WorkItemRepository> {
    repo: R,
}

impl<R: WorkItemRepository> WorkItemService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_task(&self, owner: UserId, fields: &NewWorkItem) -> ServiceResult<WorkItem> {
        self.create(owner, ItemKind::Task, fields)
    }

    pub fn create_project(&self, owner: UserId, fields: &NewWorkItem) -> ServiceResult<WorkItem> {
        self.create(owner, ItemKind::Project, fields)
    }

    /// Creates one item in `kind`'s collection and returns the stored record.
    pub fn create(
        &self,
        owner: UserId,
        kind: ItemKind,
        fields: &NewWorkItem,
    ) -> ServiceResult<WorkItem> {
        fields.validate_for(kind)?;
        let id = self.repo.create(owner, kind, fields)?;
        info!(
            "event=work_item_create module=service status=ok kind={} id={id}",
            kind.as_str()
        );
        self.repo
            .get(owner, kind, id)?
            .ok_or(ServiceError::InconsistentState(
                "created item not found in read-back",
            ))
    }

    pub fn get(
        &self,
        owner: UserId,
        kind: ItemKind,
        id: WorkItemId,
    ) -> ServiceResult<Option<WorkItem>> {
        Ok(self.repo.get(owner, kind, id)?)
    }

    /// Lists all items of `kind`, newest first.
    pub fn list(&self, owner: UserId, kind: ItemKind) -> ServiceResult<Vec<WorkItem>> {
        Ok(self.repo.list_by_owner(owner, kind)?)
    }

    /// Lists items of `kind` that are not completed, newest first.
    pub fn list_active(&self, owner: UserId, kind: ItemKind) -> ServiceResult<Vec<WorkItem>> {
        let (active, _) = partition_by_completion(&self.list(owner, kind)?);
        Ok(active)
    }

    /// Completed tasks followed by completed projects, each newest first.
    pub fn completed_items(&self, owner: UserId) -> ServiceResult<Vec<WorkItem>> {
        let (_, mut completed) = partition_by_completion(&self.list(owner, ItemKind::Task)?);
        let (_, projects) = partition_by_completion(&self.list(owner, ItemKind::Project)?);
        completed.extend(projects);
        Ok(completed)
    }

    /// Tasks due on `today`, in any completion state.
    pub fn todays_tasks(&self, owner: UserId, today: NaiveDate) -> ServiceResult<Vec<WorkItem>> {
        let mut tasks = self.list(owner, ItemKind::Task)?;
        tasks.retain(|task| is_due_today(task, today));
        Ok(tasks)
    }

    /// Applies an owner edit of descriptive fields.
    pub fn edit(
        &self,
        owner: UserId,
        kind: ItemKind,
        id: WorkItemId,
        edit: &WorkItemEdit,
    ) -> ServiceResult<ItemUpdate> {
        self.transition(owner, kind, id, "edit", |item| edit.apply_to(item))
    }

    /// Sets progress (clamped to `0..=100`); reaching 100 completes the item.
    pub fn update_progress(
        &self,
        owner: UserId,
        kind: ItemKind,
        id: WorkItemId,
        progress: i32,
        now: DateTime<Utc>,
    ) -> ServiceResult<ItemUpdate> {
        self.transition(owner, kind, id, "progress", |item| {
            apply_progress_update(item, progress, now)
        })
    }

    pub fn toggle_completion(
        &self,
        owner: UserId,
        kind: ItemKind,
        id: WorkItemId,
        now: DateTime<Utc>,
    ) -> ServiceResult<ItemUpdate> {
        self.transition(owner, kind, id, "toggle", |item| toggle_completion(item, now))
    }

    /// Hard-deletes one item; deleting a missing id is a no-op.
    pub fn delete(
        &self,
        owner: UserId,
        kind: ItemKind,
        id: WorkItemId,
    ) -> ServiceResult<WriteOutcome> {
        let outcome = self.repo.delete(owner, kind, id)?;
        if outcome == WriteOutcome::Applied {
            info!(
                "event=work_item_delete module=service status=ok kind={} id={id}",
                kind.as_str()
            );
        }
        Ok(outcome)
    }

    fn transition(
        &self,
        owner: UserId,
        kind: ItemKind,
        id: WorkItemId,
        action: &'static str,
        next_state: impl FnOnce(&WorkItem) -> WorkItem,
    ) -> ServiceResult<ItemUpdate> {
        let Some(current) = self.repo.get(owner, kind, id)? else {
            warn!(
                "event=work_item_{action} module=service status=skip reason=not_found kind={} id={id}",
                kind.as_str()
            );
            return Ok(ItemUpdate::Missing);
        };

        let next = next_state(&current);
        next.validate()?;

        let patch = WorkItemPatch::diff(&current, &next);
        if self.repo.update(owner, kind, id, &patch)? == WriteOutcome::Missing {
            return Ok(ItemUpdate::Missing);
        }

        let stored = self
            .repo
            .get(owner, kind, id)?
            .ok_or(ServiceError::InconsistentState(
                "updated item not found in read-back",
            ))?;
        if !current.completed && stored.completed {
            info!(
                "event=work_item_complete module=service status=ok kind={} id={id} via={action}",
                kind.as_str()
            );
        }
        Ok(ItemUpdate::Applied(stored))
    }
}
