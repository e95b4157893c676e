use chrono::{NaiveDate, Utc};
use taskflow_core::db::open_db_in_memory;
use taskflow_core::{
    ItemKind, NewWorkItem, Priority, SqliteWorkItemRepository, StatsService, TaskCounts,
    WorkItemService,
};
use uuid::Uuid;

fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

#[test]
fn empty_account_reports_zero_percent() {
    let conn = open_db_in_memory().unwrap();
    let stats = StatsService::new(SqliteWorkItemRepository::new(&conn));

    let summary = stats.dashboard(Uuid::new_v4()).unwrap();
    assert_eq!(summary.total_items(), 0);
    assert_eq!(summary.productivity_percentage, 0);
}

#[test]
fn dashboard_counts_both_collections_and_rounds() {
    let conn = open_db_in_memory().unwrap();
    let items = WorkItemService::new(SqliteWorkItemRepository::new(&conn));
    let stats = StatsService::new(SqliteWorkItemRepository::new(&conn));
    let owner = Uuid::new_v4();

    let mut ids = Vec::new();
    for (kind, title) in [
        (ItemKind::Task, "a"),
        (ItemKind::Task, "b"),
        (ItemKind::Project, "c"),
    ] {
        let item = items
            .create(owner, kind, &NewWorkItem::new(title, due(), Priority::Low))
            .unwrap();
        ids.push((kind, item.id));
    }

    let (kind, id) = ids[1];
    items.update_progress(owner, kind, id, 50, Utc::now()).unwrap();
    let (kind, id) = ids[2];
    items.update_progress(owner, kind, id, 100, Utc::now()).unwrap();

    let summary = stats.dashboard(owner).unwrap();
    assert_eq!(
        summary.tasks,
        TaskCounts {
            total: 2,
            completed: 0,
            pending: 2
        }
    );
    assert_eq!(summary.projects.completed, 1);
    assert_eq!(summary.productivity_percentage, 33);

    let (kind, id) = ids[0];
    items.toggle_completion(owner, kind, id, Utc::now()).unwrap();
    assert_eq!(stats.productivity_percentage(owner).unwrap(), 67);
}

#[test]
fn stats_ignore_other_owners() {
    let conn = open_db_in_memory().unwrap();
    let items = WorkItemService::new(SqliteWorkItemRepository::new(&conn));
    let stats = StatsService::new(SqliteWorkItemRepository::new(&conn));
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let task = items
        .create_task(stranger, &NewWorkItem::new("theirs", due(), Priority::Low))
        .unwrap();
    items
        .toggle_completion(stranger, ItemKind::Task, task.id, Utc::now())
        .unwrap();

    assert_eq!(stats.productivity_percentage(owner).unwrap(), 0);
    assert_eq!(stats.productivity_percentage(stranger).unwrap(), 100);
}
