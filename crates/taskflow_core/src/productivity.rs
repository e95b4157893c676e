//! Productivity rules over work item collections.
//!
//! # Responsibility
//! - Partition items into active/completed.
//! - Map progress updates and manual toggles onto the completion sub-state.
//! - Compute aggregate completion percentages and overdue flags.
//!
//! # Invariants
//! - Every function here is pure: no I/O, no clock reads.
//! - Percentages round half up and are `0` for empty input.
//! - Progress reaching 100 completes an item; progress below 100 never
//!   un-completes one. Only a manual toggle returns an item to active.

use crate::model::work_item::{ItemKind, WorkItem, MAX_PROGRESS};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Splits items into `(active, completed)` preserving input order.
pub fn partition_by_completion(items: &[WorkItem]) -> (Vec<WorkItem>, Vec<WorkItem>) {
    items.iter().cloned().partition(WorkItem::is_active)
}

/// Returns whether `item` is due strictly before `today`.
///
/// Completed items still evaluate; use [`overdue_flag`] for display.
pub fn is_overdue(item: &WorkItem, today: NaiveDate) -> bool {
    item.due_date < today
}

/// Overdue flag as shown to users: suppressed once the item is completed.
pub fn overdue_flag(item: &WorkItem, today: NaiveDate) -> bool {
    !item.completed && is_overdue(item, today)
}

pub fn is_due_today(item: &WorkItem, today: NaiveDate) -> bool {
    item.due_date == today
}

/// Percentage of completed items, rounded half up.
///
/// Returns `0` for an empty slice.
pub fn compute_progress_percentage(items: &[WorkItem]) -> u8 {
    let completed = items.iter().filter(|item| item.completed).count();
    percentage(completed, items.len())
}

/// `round(100 * part / total)` with ties rounding up; `0` when `total == 0`.
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let part = part.min(total) as u128;
    let total = total as u128;
    // floor((100 * part / total) + 0.5) in integers.
    let rounded = (200 * part + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(MAX_PROGRESS)
}

/// Applies a requested progress value to `item`.
///
/// `new_progress` is clamped to `0..=100`. Reaching 100 completes the item
/// with `completed_at = now`, unless it is already completed, in which case
/// the existing timestamp is kept.
pub fn apply_progress_update(item: &WorkItem, new_progress: i32, now: DateTime<Utc>) -> WorkItem {
    let clamped = new_progress.clamp(0, i32::from(MAX_PROGRESS));
    let mut next = item.clone();
    next.progress = u8::try_from(clamped).unwrap_or(MAX_PROGRESS);

    if next.progress == MAX_PROGRESS && !next.completed {
        next.completed = true;
        next.completed_at = Some(now);
    }
    next
}

/// Flips completion. Progress is left untouched in both directions.
pub fn toggle_completion(item: &WorkItem, now: DateTime<Utc>) -> WorkItem {
    let mut next = item.clone();
    next.completed = !item.completed;
    next.completed_at = if next.completed { Some(now) } else { None };
    next
}

/// Total/completed/pending counts for one list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskCounts {
    pub fn from_items(items: &[WorkItem]) -> Self {
        let completed = items.iter().filter(|item| item.completed).count();
        Self {
            total: items.len(),
            completed,
            pending: items.len() - completed,
        }
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.completed, self.total)
    }
}

/// Dashboard aggregate across both collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductivitySummary {
    pub tasks: TaskCounts,
    pub projects: TaskCounts,
    /// Completed share over tasks and projects together.
    pub productivity_percentage: u8,
}

impl ProductivitySummary {
    pub fn from_items(tasks: &[WorkItem], projects: &[WorkItem]) -> Self {
        let tasks = TaskCounts::from_items(tasks);
        let projects = TaskCounts::from_items(projects);
        Self {
            tasks,
            projects,
            productivity_percentage: percentage(
                tasks.completed + projects.completed,
                tasks.total + projects.total,
            ),
        }
    }

    pub fn total_items(&self) -> usize {
        self.tasks.total + self.projects.total
    }

    pub fn completed_items(&self) -> usize {
        self.tasks.completed + self.projects.completed
    }

    pub fn counts_for(&self, kind: ItemKind) -> TaskCounts {
        match kind {
            ItemKind::Task => self.tasks,
            ItemKind::Project => self.projects,
        }
    }
}
