//! Roster command-line transport.
//!
//! # Responsibility
//! - Map subcommands onto `StudentService` lifecycle operations.
//! - Print results as JSON and report business errors with exit code 1.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use roster_core::{
    init_logging_from_config, open_db, Actor, Clock, NewStudent, RosterConfig, StudentService,
    StudentUpdate, SystemClock,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Student roster with auditable lifecycle", long_about = None)]
struct Cli {
    /// SQLite database file (overrides ROSTER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Actor recorded in history and activity (defaults to the system actor)
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new student
    Add {
        name: String,
        email: String,
        /// Date of birth as YYYY-MM-DD
        dob: NaiveDate,
    },
    /// List active students
    List,
    /// List soft-deleted students
    Deleted,
    /// Show history snapshots for one student, newest first
    History { id: Uuid },
    /// Change name and/or email of an active student
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Soft-delete a student
    Delete { id: Uuid },
    /// Restore a soft-deleted student
    Restore { id: Uuid },
    /// Permanently remove a student (not audited)
    Purge { id: Uuid },
    /// Show the full activity log
    Activity,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RosterConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let actor = parse_actor(cli.actor)?;

    let mut conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let mut service = StudentService::with_clock(&mut conn, SystemClock, config.system_actor())?;

    let output = execute(&mut service, actor.as_ref(), cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_actor(actor: Option<String>) -> Result<Option<Actor>> {
    match actor {
        Some(name) => Ok(Some(Actor::new(name).context("--actor must not be blank")?)),
        None => Ok(None),
    }
}

fn execute<C: Clock>(
    service: &mut StudentService<'_, C>,
    actor: Option<&Actor>,
    command: Commands,
) -> Result<Value> {
    Ok(match command {
        Commands::Add { name, email, dob } => {
            json!(service.create(actor, NewStudent::new(name, email, dob))?)
        }
        Commands::List => json!(service.list_active()?),
        Commands::Deleted => json!(service.list_deleted()?),
        Commands::History { id } => json!(service.get_history(id)?),
        Commands::Update { id, name, email } => {
            json!(service.update(actor, id, StudentUpdate { name, email })?)
        }
        Commands::Delete { id } => {
            service.soft_delete(actor, id)?;
            json!({ "id": id, "deleted": true })
        }
        Commands::Restore { id } => json!(service.restore(actor, id)?),
        Commands::Purge { id } => {
            service.hard_delete(id)?;
            json!({ "id": id, "purged": true })
        }
        Commands::Activity => json!(service.list_activity()?),
    })
}
