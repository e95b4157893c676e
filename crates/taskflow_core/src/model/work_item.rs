//! WorkItem domain model.
//!
//! # Responsibility
//! - Define the single record shape shared by tasks and projects.
//! - Expose the completion sub-state and structural validation.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `completed == true` iff `completed_at` is set and not earlier than
//!   `created_at`.
//! - `progress` stays within `0..=100`.
//! - Project details are only carried by `ItemKind::Project` items.

use crate::model::user::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for tasks and projects.
pub type WorkItemId = Uuid;

/// Upper bound for `WorkItem::progress`.
pub const MAX_PROGRESS: u8 = 100;

/// Collection a work item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Task,
    Project,
}

impl ItemKind {
    /// Stable string id used in storage and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Project => "project",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ItemValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "project" => Ok(Self::Project),
            other => Err(ItemValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Closed priority scale. Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ItemValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ItemValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// Descriptive, unvalidated fields only projects carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub team_members: String,
    pub milestones: String,
}

/// Completion sub-state of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Active { progress: u8 },
    Completed { completed_at: DateTime<Utc> },
}

/// Canonical task/project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    /// Set at creation, never changed afterwards.
    pub owner_id: UserId,
    pub kind: ItemKind,
    pub title: String,
    pub description: String,
    /// Day granularity; no time-of-day semantics.
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub progress: u8,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `Some` only for `ItemKind::Project`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectDetails>,
}

impl WorkItem {
    /// Returns the completion sub-state derived from `completed`/`completed_at`.
    ///
    /// An inconsistent record (completed without timestamp) reports as active.
    pub fn completion_state(&self) -> CompletionState {
        match (self.completed, self.completed_at) {
            (true, Some(completed_at)) => CompletionState::Completed { completed_at },
            _ => CompletionState::Active {
                progress: self.progress,
            },
        }
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Validates structural invariants of a stored or about-to-be-stored item.
    ///
    /// # Errors
    /// - Empty (whitespace-only) title.
    /// - Progress above 100.
    /// - `completed` and `completed_at` disagreeing, or completion before creation.
    /// - Project details attached to a task.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        validate_title(&self.title)?;
        if self.progress > MAX_PROGRESS {
            return Err(ItemValidationError::ProgressOutOfRange(self.progress));
        }
        match (self.completed, self.completed_at) {
            (true, None) | (false, Some(_)) => {
                return Err(ItemValidationError::CompletionMismatch {
                    completed: self.completed,
                });
            }
            (true, Some(completed_at)) if completed_at < self.created_at => {
                return Err(ItemValidationError::CompletedBeforeCreated);
            }
            _ => {}
        }
        validate_project_details(self.kind, self.project.as_ref())
    }
}

/// Creation-time fields supplied by the owner.
///
/// `progress` and `completed` are not part of the input: every item starts
/// as `Active(0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkItem {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub project: Option<ProjectDetails>,
}

impl NewWorkItem {
    pub fn new(title: impl Into<String>, due_date: NaiveDate, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date,
            priority,
            project: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_project_details(mut self, details: ProjectDetails) -> Self {
        self.project = Some(details);
        self
    }

    /// Validates input for the target collection.
    pub fn validate_for(&self, kind: ItemKind) -> Result<(), ItemValidationError> {
        validate_title(&self.title)?;
        validate_project_details(kind, self.project.as_ref())
    }
}

/// Owner edit of descriptive fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub project: Option<ProjectDetails>,
}

impl WorkItemEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.project.is_none()
    }

    /// Applies this edit to a copy of `item`.
    pub fn apply_to(&self, item: &WorkItem) -> WorkItem {
        let mut next = item.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(due_date) = self.due_date {
            next.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(project) = &self.project {
            next.project = Some(project.clone());
        }
        next
    }
}

/// Model-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyTitle,
    ProgressOutOfRange(u8),
    CompletionMismatch { completed: bool },
    CompletedBeforeCreated,
    ProjectDetailsOnTask,
    UnknownPriority(String),
    UnknownKind(String),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::ProgressOutOfRange(value) => {
                write!(f, "progress {value} is outside 0..={MAX_PROGRESS}")
            }
            Self::CompletionMismatch { completed: true } => {
                write!(f, "completed item is missing completed_at")
            }
            Self::CompletionMismatch { completed: false } => {
                write!(f, "active item must not carry completed_at")
            }
            Self::CompletedBeforeCreated => write!(f, "completed_at is earlier than created_at"),
            Self::ProjectDetailsOnTask => write!(f, "tasks cannot carry project details"),
            Self::UnknownPriority(value) => {
                write!(f, "unknown priority `{value}`; expected low|medium|high")
            }
            Self::UnknownKind(value) => {
                write!(f, "unknown item kind `{value}`; expected task|project")
            }
        }
    }
}

impl Error for ItemValidationError {}

fn validate_title(title: &str) -> Result<(), ItemValidationError> {
    if title.trim().is_empty() {
        return Err(ItemValidationError::EmptyTitle);
    }
    Ok(())
}

fn validate_project_details(
    kind: ItemKind,
    details: Option<&ProjectDetails>,
) -> Result<(), ItemValidationError> {
    if kind == ItemKind::Task && details.is_some() {
        return Err(ItemValidationError::ProjectDetailsOnTask);
    }
    Ok(())
}
