//! Subcommand definitions and handlers.
//!
//! Handlers resolve the signed-in owner from the session, call one core
//! service and hand the result to [`Output`]. Failures propagate unchanged so
//! `main` can render their user message.

use crate::output::Output;
use anyhow::{bail, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Subcommand};
use rusqlite::Connection;
use taskflow_core::{
    IdentityProvider, ItemKind, NewWorkItem, Priority, ProfileFields, ProjectDetails,
    Session, SqliteIdentityProvider, SqliteWorkItemRepository, StatsService, TaskCounts, UserId,
    WorkItemEdit, WorkItemService, WriteOutcome,
};
use uuid::Uuid;

type CliSession<'conn> = Session<SqliteIdentityProvider<'conn>>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and sign in.
    Signup(SignupArgs),
    /// Sign in to an existing account.
    Login(LoginArgs),
    /// Sign out of the current account.
    Logout,
    /// Show the signed-in account and its profile.
    Whoami,
    /// Request a password reset for an account.
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Manage tasks.
    #[command(subcommand)]
    Task(ItemCommand),
    /// Manage projects.
    #[command(subcommand)]
    Project(ItemCommand),
    /// Tasks due today, with completion counts.
    Today {
        /// Day to report instead of the local date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Completed tasks and projects.
    Completed,
    /// Dashboard totals and productivity percentage.
    Stats,
}

#[derive(Args, Debug)]
pub struct SignupArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "")]
    full_name: String,
    #[arg(long, default_value = "")]
    nickname: String,
    #[arg(long, default_value = "")]
    role_model: String,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// Create a new item.
    Add(AddArgs),
    /// List items, newest first.
    List {
        /// Only items that are not completed.
        #[arg(long)]
        active: bool,
    },
    /// Edit descriptive fields.
    Edit(EditArgs),
    /// Set progress (0-100); reaching 100 completes the item.
    Progress {
        id: Uuid,
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
    /// Flip completion.
    Toggle { id: Uuid },
    /// Delete permanently.
    Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    due: NaiveDate,
    /// low | medium | high
    #[arg(long)]
    priority: Priority,
    /// Projects only.
    #[arg(long)]
    team_members: Option<String>,
    /// Projects only.
    #[arg(long)]
    milestones: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    id: Uuid,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    due: Option<NaiveDate>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    team_members: Option<String>,
    #[arg(long)]
    milestones: Option<String>,
}

pub fn run(
    command: Command,
    session: &mut CliSession<'_>,
    conn: &Connection,
    out: &Output,
) -> Result<()> {
    let today = Local::now().date_naive();

    match command {
        Command::Signup(args) => {
            let profile = ProfileFields {
                full_name: args.full_name,
                nickname: args.nickname,
                role_model: args.role_model,
            };
            let identity = session.sign_up(&args.email, &args.password, &profile)?;
            out.identity("Account created", &identity)
        }
        Command::Login(args) => {
            let identity = session.sign_in(&args.email, &args.password)?;
            out.identity("Signed in", &identity)
        }
        Command::Logout => {
            session.sign_out()?;
            out.message("Signed out.")
        }
        Command::Whoami => {
            let identity = session.require_user()?;
            let profile = session.provider().profile(identity.uid)?;
            out.whoami(identity, profile.as_ref())
        }
        Command::ResetPassword { email } => {
            session.provider().send_password_reset(&email)?;
            out.message("Password reset requested.")
        }
        Command::Task(command) => {
            let owner = session.require_user()?.uid;
            run_item(command, ItemKind::Task, owner, conn, out, today)
        }
        Command::Project(command) => {
            let owner = session.require_user()?.uid;
            run_item(command, ItemKind::Project, owner, conn, out, today)
        }
        Command::Today { date } => {
            let owner = session.require_user()?.uid;
            let day = date.unwrap_or(today);
            let service = WorkItemService::new(SqliteWorkItemRepository::new(conn));
            let tasks = service.todays_tasks(owner, day)?;
            out.today(day, &TaskCounts::from_items(&tasks), &tasks)
        }
        Command::Completed => {
            let owner = session.require_user()?.uid;
            let service = WorkItemService::new(SqliteWorkItemRepository::new(conn));
            out.items(&service.completed_items(owner)?, today)
        }
        Command::Stats => {
            let owner = session.require_user()?.uid;
            let stats = StatsService::new(SqliteWorkItemRepository::new(conn));
            out.summary(&stats.dashboard(owner)?)
        }
    }
}

fn run_item(
    command: ItemCommand,
    kind: ItemKind,
    owner: UserId,
    conn: &Connection,
    out: &Output,
    today: NaiveDate,
) -> Result<()> {
    let service = WorkItemService::new(SqliteWorkItemRepository::new(conn));

    match command {
        ItemCommand::Add(args) => {
            let mut fields = NewWorkItem::new(args.title, args.due, args.priority)
                .with_description(args.description);
            if args.team_members.is_some() || args.milestones.is_some() {
                fields = fields.with_project_details(ProjectDetails {
                    team_members: args.team_members.unwrap_or_default(),
                    milestones: args.milestones.unwrap_or_default(),
                });
            }
            let item = service.create(owner, kind, &fields)?;
            out.item(&item, today)
        }
        ItemCommand::List { active } => {
            let items = if active {
                service.list_active(owner, kind)?
            } else {
                service.list(owner, kind)?
            };
            out.items(&items, today)
        }
        ItemCommand::Edit(args) => {
            let id = args.id;
            let project = if args.team_members.is_some() || args.milestones.is_some() {
                let Some(current) = service.get(owner, kind, id)? else {
                    return out.missing(kind, id);
                };
                let current = current.project.unwrap_or_default();
                Some(ProjectDetails {
                    team_members: args.team_members.unwrap_or(current.team_members),
                    milestones: args.milestones.unwrap_or(current.milestones),
                })
            } else {
                None
            };
            let edit = WorkItemEdit {
                title: args.title,
                description: args.description,
                due_date: args.due,
                priority: args.priority,
                project,
            };
            if edit.is_empty() {
                bail!("nothing to edit; pass at least one field flag");
            }
            out.update(kind, id, service.edit(owner, kind, id, &edit)?, today)
        }
        ItemCommand::Progress { id, value } => {
            let update = service.update_progress(owner, kind, id, value, Utc::now())?;
            out.update(kind, id, update, today)
        }
        ItemCommand::Toggle { id } => {
            let update = service.toggle_completion(owner, kind, id, Utc::now())?;
            out.update(kind, id, update, today)
        }
        ItemCommand::Delete { id } => match service.delete(owner, kind, id)? {
            WriteOutcome::Applied => out.message(&format!("Deleted {kind} {id}.")),
            WriteOutcome::Missing => out.missing(kind, id),
        },
    }
}
