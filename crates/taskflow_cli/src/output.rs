//! Text and JSON rendering of command results.

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;
use taskflow_core::productivity::overdue_flag;
use taskflow_core::{
    ItemKind, ItemUpdate, ProductivitySummary, TaskCounts, UserIdentity, UserProfile, WorkItem,
};
use uuid::Uuid;

pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn message(&self, text: &str) -> Result<()> {
        if self.json {
            println!("{}", json!({ "message": text }));
        } else {
            println!("{text}");
        }
        Ok(())
    }

    /// Reports a no-op on an unknown id. Not a failure.
    pub fn missing(&self, kind: ItemKind, id: Uuid) -> Result<()> {
        if self.json {
            println!("{}", json!({ "missing": true, "kind": kind.as_str(), "id": id }));
        } else {
            eprintln!("No {kind} with id {id}; nothing changed.");
        }
        Ok(())
    }

    pub fn identity(&self, headline: &str, identity: &UserIdentity) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(identity)?);
        } else {
            println!("{headline}: {} <{}>", identity.display_name, identity.email);
        }
        Ok(())
    }

    pub fn whoami(&self, identity: &UserIdentity, profile: Option<&UserProfile>) -> Result<()> {
        if self.json {
            let value = json!({ "identity": identity, "profile": profile });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("{} <{}>", identity.display_name, identity.email);
        println!("uid: {}", identity.uid);
        if let Some(profile) = profile {
            for (label, value) in [
                ("full name", &profile.fields.full_name),
                ("nickname", &profile.fields.nickname),
                ("role model", &profile.fields.role_model),
            ] {
                if !value.is_empty() {
                    println!("{label}: {value}");
                }
            }
            println!("member since: {}", profile.created_at.format("%Y-%m-%d"));
        }
        Ok(())
    }

    pub fn item(&self, item: &WorkItem, today: NaiveDate) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            print_item(item, today);
        }
        Ok(())
    }

    pub fn update(
        &self,
        kind: ItemKind,
        id: Uuid,
        update: ItemUpdate,
        today: NaiveDate,
    ) -> Result<()> {
        match update {
            ItemUpdate::Applied(item) => self.item(&item, today),
            ItemUpdate::Missing => self.missing(kind, id),
        }
    }

    pub fn items(&self, items: &[WorkItem], today: NaiveDate) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(items)?);
            return Ok(());
        }
        if items.is_empty() {
            println!("Nothing here yet.");
        }
        for item in items {
            print_item(item, today);
        }
        Ok(())
    }

    pub fn today(&self, day: NaiveDate, counts: &TaskCounts, tasks: &[WorkItem]) -> Result<()> {
        if self.json {
            let value = json!({
                "date": day.to_string(),
                "counts": counts,
                "percentage": counts.percentage(),
                "tasks": tasks,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!(
            "{day}: {} total, {} completed, {} pending ({}%)",
            counts.total,
            counts.completed,
            counts.pending,
            counts.percentage()
        );
        self.items(tasks, day)
    }

    pub fn summary(&self, summary: &ProductivitySummary) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(summary)?);
            return Ok(());
        }

        for (label, kind) in [("Tasks", ItemKind::Task), ("Projects", ItemKind::Project)] {
            let counts = summary.counts_for(kind);
            println!(
                "{label}: {} total, {} completed, {} pending",
                counts.total, counts.completed, counts.pending
            );
        }
        println!("Productivity: {}%", summary.productivity_percentage);
        Ok(())
    }
}

fn print_item(item: &WorkItem, today: NaiveDate) {
    let mark = if item.completed { "[x]" } else { "[ ]" };
    let overdue = if overdue_flag(item, today) {
        " OVERDUE"
    } else {
        ""
    };
    println!(
        "{mark} {} {} ({} priority, due {}, {}%){overdue}",
        item.id, item.title, item.priority, item.due_date, item.progress
    );
    if !item.description.is_empty() {
        println!("    {}", item.description);
    }
    if let Some(project) = &item.project {
        if !project.team_members.is_empty() {
            println!("    team: {}", project.team_members);
        }
        if !project.milestones.is_empty() {
            println!("    milestones: {}", project.milestones);
        }
    }
}
