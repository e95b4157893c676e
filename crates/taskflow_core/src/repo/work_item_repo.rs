//! Work item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD over the `tasks` and `projects` collections.
//! - Assign ids and `created_at`/`updated_at` timestamps on write.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every statement filters on `owner_id` and `kind`; another owner's item
//!   is indistinguishable from a missing one.
//! - `update`/`delete` on a missing id are logged no-ops, not errors.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{bool_to_int, from_epoch_ms, to_epoch_ms, DbError};
use crate::model::user::UserId;
use crate::model::work_item::{
    ItemKind, ItemValidationError, NewWorkItem, Priority, ProjectDetails, WorkItem, WorkItemId,
    MAX_PROGRESS,
};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

const WORK_ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    owner_id,
    kind,
    title,
    description,
    due_date,
    priority,
    progress,
    completed,
    completed_at,
    team_members,
    milestones,
    created_at,
    updated_at
FROM work_items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence-layer failure.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    /// Storage unavailable or rejecting statements.
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted work item: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of a write addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// No row matched the owner/kind/id triple; nothing was written.
    Missing,
}

/// Partial field update. `None` leaves a column unchanged.
///
/// `completed_at: Some(None)` clears the timestamp. `completed` and
/// `completed_at` are patched together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub progress: Option<u8>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub project: Option<ProjectDetails>,
}

impl WorkItemPatch {
    /// Builds the patch that turns `before` into `after`.
    pub fn diff(before: &WorkItem, after: &WorkItem) -> Self {
        fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
            (before != after).then(|| after.clone())
        }

        let completion_changed =
            before.completed != after.completed || before.completed_at != after.completed_at;

        Self {
            title: changed(&before.title, &after.title),
            description: changed(&before.description, &after.description),
            due_date: changed(&before.due_date, &after.due_date),
            priority: changed(&before.priority, &after.priority),
            progress: changed(&before.progress, &after.progress),
            completed: completion_changed.then_some(after.completed),
            completed_at: completion_changed.then_some(after.completed_at),
            project: match (&before.project, &after.project) {
                (before, Some(after)) if before.as_ref() != Some(after) => Some(after.clone()),
                _ => None,
            },
        }
    }
}

/// Per-user CRUD contract over work items.
pub trait WorkItemRepository {
    /// Inserts a new `Active(0)` item and returns its id.
    fn create(&self, owner_id: UserId, kind: ItemKind, fields: &NewWorkItem)
        -> RepoResult<WorkItemId>;
    /// Lists the owner's items of `kind`, newest `created_at` first.
    fn list_by_owner(&self, owner_id: UserId, kind: ItemKind) -> RepoResult<Vec<WorkItem>>;
    fn get(&self, owner_id: UserId, kind: ItemKind, id: WorkItemId)
        -> RepoResult<Option<WorkItem>>;
    /// Applies `patch` and refreshes `updated_at`.
    fn update(
        &self,
        owner_id: UserId,
        kind: ItemKind,
        id: WorkItemId,
        patch: &WorkItemPatch,
    ) -> RepoResult<WriteOutcome>;
    /// Hard-deletes one item.
    fn delete(&self, owner_id: UserId, kind: ItemKind, id: WorkItemId)
        -> RepoResult<WriteOutcome>;
}

/// SQLite-backed work item repository.
pub struct SqliteWorkItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkItemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl WorkItemRepository for SqliteWorkItemRepository<'_> {
    fn create(
        &self,
        owner_id: UserId,
        kind: ItemKind,
        fields: &NewWorkItem,
    ) -> RepoResult<WorkItemId> {
        fields.validate_for(kind)?;

        let id = Uuid::new_v4();
        let now = to_epoch_ms(Utc::now());
        let (team_members, milestones) = split_project(fields.project.as_ref());

        self.conn.execute(
            "INSERT INTO work_items (
                uuid,
                owner_id,
                kind,
                title,
                description,
                due_date,
                priority,
                progress,
                completed,
                completed_at,
                team_members,
                milestones,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, NULL, ?8, ?9, ?10, ?10);",
            params![
                id.to_string(),
                owner_id.to_string(),
                kind.as_str(),
                fields.title.trim(),
                fields.description.as_str(),
                fields.due_date.format(DUE_DATE_FORMAT).to_string(),
                fields.priority.as_str(),
                team_members,
                milestones,
                now,
            ],
        )?;

        debug!(
            "event=work_item_create module=repo status=ok kind={} id={}",
            kind.as_str(),
            id
        );
        Ok(id)
    }

    fn list_by_owner(&self, owner_id: UserId, kind: ItemKind) -> RepoResult<Vec<WorkItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WORK_ITEM_SELECT_SQL}
             WHERE owner_id = ?1 AND kind = ?2
             ORDER BY created_at DESC, rowid DESC;"
        ))?;

        let mut rows = stmt.query(params![owner_id.to_string(), kind.as_str()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_work_item_row(row)?);
        }
        Ok(items)
    }

    fn get(
        &self,
        owner_id: UserId,
        kind: ItemKind,
        id: WorkItemId,
    ) -> RepoResult<Option<WorkItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WORK_ITEM_SELECT_SQL}
             WHERE uuid = ?1 AND owner_id = ?2 AND kind = ?3;"
        ))?;

        let mut rows = stmt.query(params![
            id.to_string(),
            owner_id.to_string(),
            kind.as_str()
        ])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_work_item_row(row)?)),
            None => Ok(None),
        }
    }

    fn update(
        &self,
        owner_id: UserId,
        kind: ItemKind,
        id: WorkItemId,
        patch: &WorkItemPatch,
    ) -> RepoResult<WriteOutcome> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(RepoError::Validation(ItemValidationError::EmptyTitle));
            }
        }
        if let Some(progress) = patch.progress {
            if progress > MAX_PROGRESS {
                return Err(RepoError::Validation(
                    ItemValidationError::ProgressOutOfRange(progress),
                ));
            }
        }
        match (patch.completed, patch.completed_at) {
            (None, None) => {}
            (Some(completed), Some(completed_at)) if completed == completed_at.is_some() => {}
            (completed, completed_at) => {
                return Err(RepoError::Validation(
                    ItemValidationError::CompletionMismatch {
                        completed: completed.unwrap_or(matches!(completed_at, Some(Some(_)))),
                    },
                ));
            }
        }
        if patch.project.is_some() && kind == ItemKind::Task {
            return Err(RepoError::Validation(
                ItemValidationError::ProjectDetailsOnTask,
            ));
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.trim().to_string()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            bind_values.push(Value::Text(description.clone()));
        }
        if let Some(due_date) = patch.due_date {
            assignments.push("due_date = ?");
            bind_values.push(Value::Text(due_date.format(DUE_DATE_FORMAT).to_string()));
        }
        if let Some(priority) = patch.priority {
            assignments.push("priority = ?");
            bind_values.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(progress) = patch.progress {
            assignments.push("progress = ?");
            bind_values.push(Value::Integer(i64::from(progress)));
        }
        if let Some(completed) = patch.completed {
            assignments.push("completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }
        if let Some(completed_at) = patch.completed_at {
            assignments.push("completed_at = ?");
            bind_values.push(completed_at.map_or(Value::Null, |at| Value::Integer(to_epoch_ms(at))));
        }
        if let Some(project) = &patch.project {
            assignments.push("team_members = ?");
            bind_values.push(Value::Text(project.team_members.clone()));
            assignments.push("milestones = ?");
            bind_values.push(Value::Text(project.milestones.clone()));
        }
        assignments.push("updated_at = ?");
        bind_values.push(Value::Integer(to_epoch_ms(Utc::now())));

        bind_values.push(Value::Text(id.to_string()));
        bind_values.push(Value::Text(owner_id.to_string()));
        bind_values.push(Value::Text(kind.as_str().to_string()));

        let sql = format!(
            "UPDATE work_items SET {} WHERE uuid = ? AND owner_id = ? AND kind = ?;",
            assignments.join(", ")
        );
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;

        if changed == 0 {
            warn!(
                "event=work_item_update module=repo status=skip reason=not_found kind={} id={}",
                kind.as_str(),
                id
            );
            return Ok(WriteOutcome::Missing);
        }
        Ok(WriteOutcome::Applied)
    }

    fn delete(
        &self,
        owner_id: UserId,
        kind: ItemKind,
        id: WorkItemId,
    ) -> RepoResult<WriteOutcome> {
        let changed = self.conn.execute(
            "DELETE FROM work_items WHERE uuid = ?1 AND owner_id = ?2 AND kind = ?3;",
            params![id.to_string(), owner_id.to_string(), kind.as_str()],
        )?;

        if changed == 0 {
            warn!(
                "event=work_item_delete module=repo status=skip reason=not_found kind={} id={}",
                kind.as_str(),
                id
            );
            return Ok(WriteOutcome::Missing);
        }
        Ok(WriteOutcome::Applied)
    }
}

fn split_project(project: Option<&ProjectDetails>) -> (Option<&str>, Option<&str>) {
    match project {
        Some(details) => (
            Some(details.team_members.as_str()),
            Some(details.milestones.as_str()),
        ),
        None => (None, None),
    }
}

fn parse_work_item_row(row: &Row<'_>) -> RepoResult<WorkItem> {
    let id = parse_uuid(row, "uuid")?;
    let owner_id = parse_uuid(row, "owner_id")?;

    let kind_text: String = row.get("kind")?;
    let kind = kind_text.parse::<ItemKind>().map_err(|_| {
        RepoError::InvalidData(format!("invalid kind `{kind_text}` in work_items.kind"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = priority_text.parse::<Priority>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in work_items.priority"
        ))
    })?;

    let due_text: String = row.get("due_date")?;
    let due_date = NaiveDate::parse_from_str(&due_text, DUE_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid due date `{due_text}` in work_items.due_date"))
    })?;

    let progress_value: i64 = row.get("progress")?;
    let progress = u8::try_from(progress_value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid progress `{progress_value}` in work_items.progress"
        ))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in work_items.completed"
            )));
        }
    };

    let completed_at = match row.get::<_, Option<i64>>("completed_at")? {
        Some(ms) => Some(parse_timestamp(ms, "completed_at")?),
        None => None,
    };

    let team_members: Option<String> = row.get("team_members")?;
    let milestones: Option<String> = row.get("milestones")?;
    let project = match (team_members, milestones) {
        (None, None) => None,
        (team_members, milestones) => Some(ProjectDetails {
            team_members: team_members.unwrap_or_default(),
            milestones: milestones.unwrap_or_default(),
        }),
    };

    let item = WorkItem {
        id,
        owner_id,
        kind,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date,
        priority,
        progress,
        completed,
        completed_at,
        created_at: parse_timestamp(row.get("created_at")?, "created_at")?,
        updated_at: parse_timestamp(row.get("updated_at")?, "updated_at")?,
        project,
    };
    item.validate()?;
    Ok(item)
}

fn parse_uuid(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{text}` in work_items.{column}"))
    })
}

fn parse_timestamp(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    from_epoch_ms(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in work_items.{column}"))
    })
}
