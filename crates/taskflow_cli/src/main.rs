//! `taskflow` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, open storage and restore the signed-in session.
//! - Dispatch subcommands to core services.
//! - Print one user-facing message per failure and exit non-zero.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Command;
use log::error;
use output::Output;
use std::path::PathBuf;
use std::process::ExitCode;
use taskflow_core::db::open_db;
use taskflow_core::{
    init_logging, AuthError, CoreConfig, ServiceError, Session, SqliteIdentityProvider,
};

#[derive(Parser, Debug)]
#[command(
    name = "taskflow",
    author,
    version,
    about = "Personal task and project tracker",
    long_about = None
)]
struct Cli {
    /// SQLite database file. Overrides TASKFLOW_DB.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error). Overrides TASKFLOW_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Overrides TASKFLOW_LOG_DIR.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Environment first, then explicit flags.
    fn config(&self) -> CoreConfig {
        let mut config = CoreConfig::from_env();
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err:#}");
            eprintln!("{}", user_message(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config();
    config.validate()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path).with_context(|| {
        format!("failed to open database `{}`", config.db_path.display())
    })?;
    let mut session = Session::init(SqliteIdentityProvider::new(&conn))?;
    let out = Output::new(cli.json);

    commands::run(cli.command, &mut session, &conn, &out)
}

/// Maps known domain failures to their user-facing sentence.
fn user_message(err: &anyhow::Error) -> String {
    if let Some(err) = err.downcast_ref::<ServiceError>() {
        return err.user_message();
    }
    if let Some(err) = err.downcast_ref::<AuthError>() {
        return err.user_message().to_string();
    }
    format!("error: {err:#}")
}

#[cfg(test)]
mod tests {
    use super::{user_message, Cli};
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;
    use taskflow_core::{AuthError, ServiceError};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "taskflow",
            "--db",
            "/tmp/flag.sqlite3",
            "--log-level",
            "warn",
            "stats",
        ]);
        let config = cli.config();
        assert_eq!(config.db_path, PathBuf::from("/tmp/flag.sqlite3"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn domain_errors_render_user_messages() {
        let not_signed_in = anyhow::Error::from(ServiceError::NotSignedIn);
        assert_eq!(user_message(&not_signed_in), "Please sign in first.");

        let weak = anyhow::Error::from(AuthError::WeakPassword);
        assert_eq!(
            user_message(&weak),
            "Password is too weak. Please use a stronger password."
        );

        let other = anyhow::anyhow!("disk on fire");
        assert_eq!(user_message(&other), "error: disk on fire");
    }
}
