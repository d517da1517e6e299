use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use thiserror::Error;

use crate::auth::{Auth, AuthError};
use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::draft::{TaskDraft, ValidationError};
use crate::filter::TaskFilter;
use crate::kanban;
use crate::models::{Status, Subtask, Task, TaskPatch, UnknownVariant, User};
use crate::reminder::{ConsolePlatform, Dispatcher, Scheduler, SoundKind, SystemClock};
use crate::stats::Statistics;
use crate::utils::format_local;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Task board with categories, kanban view, statistics and due-date reminders")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Create an account and sign in
    Signup {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Request a password reset token, or use one with --token
    ResetPassword {
        /// Account email (to request a token)
        email: Option<String>,
        /// Reset token (to set a new password)
        #[arg(long)]
        token: Option<String>,
        /// New password; read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Update display name and avatar path
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// personal, work, shopping or other
        #[arg(long)]
        category: Option<String>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,
        /// Due time (HH:MM), 23:59 when omitted
        #[arg(long)]
        time: Option<String>,
        /// Remind this many minutes before the due time
        #[arg(long)]
        remind: Option<String>,
    },
    /// List tasks
    List {
        #[arg(long, default_value = "all")]
        category: String,
        #[arg(long, default_value = "all")]
        priority: String,
        /// all, active, todo, in-progress, done
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long)]
        json: bool,
    },
    /// Show one task with its subtasks
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Edit a task
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        remind: Option<String>,
        /// Remove the reminder
        #[arg(long, conflicts_with = "remind")]
        no_remind: bool,
    },
    /// Mark a task done (or open again with --undo)
    Done {
        id: i64,
        #[arg(long)]
        undo: bool,
    },
    /// Move a task to a board column
    Move {
        id: i64,
        /// todo, in-progress or done
        #[arg(long)]
        to: String,
    },
    /// Delete a task and its subtasks
    Delete { id: i64 },
    /// Manage subtasks
    #[command(subcommand)]
    Subtask(SubtaskCommand),
    /// Show statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Run the reminder loop without the TUI
    Watch {
        /// Evaluate once and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Subcommand)]
pub enum SubtaskCommand {
    /// Add a subtask to a task
    Add { task_id: i64, title: String },
    /// Toggle a subtask's completion
    Toggle { id: i64 },
    /// Delete a subtask
    Delete { id: i64 },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("{0}")]
    AuthError(#[from] AuthError),
    #[error("{0}")]
    ValidationError(#[from] ValidationError),
    #[error("{0}")]
    UnknownValue(#[from] UnknownVariant),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Not signed in. Run `taskboard login <email>` first.")]
    NotSignedIn,
    #[error("{0}")]
    InvalidArgument(String),
}

/// Run a non-interactive command. `Tui` is started by the caller.
pub fn run(
    command: Commands,
    db: &Database,
    config: &Config,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut auth = Auth::new();

    match command {
        Commands::Tui => Ok(()),
        Commands::Signup { email, password } => {
            let password = read_password(password, input, out)?;
            let user = auth.sign_up(db, &email, &password)?;
            writeln!(out, "Account created. Signed in as {}", user.email)?;
            Ok(())
        }
        Commands::Login { email, password } => {
            let password = read_password(password, input, out)?;
            let user = auth.sign_in(db, &email, &password)?;
            writeln!(out, "Signed in as {}", user.display_label())?;
            Ok(())
        }
        Commands::Logout => {
            auth.sign_out(db)?;
            writeln!(out, "Signed out")?;
            Ok(())
        }
        Commands::Whoami => {
            match auth.current_user(db)? {
                Some(user) => {
                    writeln!(out, "{}", user.email)?;
                    if let Some(name) = &user.display_name {
                        writeln!(out, "Name:   {}", name)?;
                    }
                    if let Some(avatar) = &user.avatar_path {
                        writeln!(out, "Avatar: {}", avatar)?;
                    }
                }
                None => writeln!(out, "Not signed in")?,
            }
            Ok(())
        }
        Commands::ResetPassword { email, token, password } => {
            handle_reset_password(&mut auth, db, email, token, password, input, out)
        }
        Commands::Profile { name, avatar } => {
            let user = auth.update_profile(db, name.as_deref(), avatar.as_deref())?;
            writeln!(out, "Profile updated: {}", user.display_label())?;
            Ok(())
        }
        Commands::Add { title, description, category, priority, due, time, remind } => {
            let user = require_user(&auth, db)?;
            let draft = TaskDraft {
                title,
                description: description.unwrap_or_default(),
                category: category.unwrap_or_default(),
                priority: priority.unwrap_or_default(),
                due_date: due,
                due_time: time.unwrap_or_default(),
                remind_minutes: remind.unwrap_or_default(),
            };
            let task = draft.validate()?.into_task(user.id);
            let id = db.create_task(&task)?;
            writeln!(out, "Task created successfully (ID: {})", id)?;
            Ok(())
        }
        Commands::List { category, priority, status, json } => {
            let user = require_user(&auth, db)?;
            let filter = TaskFilter {
                category: category.parse()?,
                priority: priority.parse()?,
                status: status.parse()?,
            };
            let tasks = db.list_tasks_by_owner(user.id)?;
            let shown = filter.apply(&tasks);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&shown)?)?;
            } else if shown.is_empty() {
                writeln!(out, "No tasks")?;
            } else {
                for task in shown {
                    writeln!(out, "{}", format_task_line(task))?;
                }
            }
            Ok(())
        }
        Commands::Show { id, json } => {
            let user = require_user(&auth, db)?;
            let task = db.get_task(id, user.id)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&task)?)?;
            } else {
                write_task_details(&task, out)?;
            }
            Ok(())
        }
        Commands::Edit { id, title, description, category, priority, due, time, remind, no_remind } => {
            let user = require_user(&auth, db)?;
            let task = db.get_task(id, user.id)?;
            let mut draft = TaskDraft::from_task(&task);
            let fields = [
                (title, &mut draft.title),
                (description, &mut draft.description),
                (category, &mut draft.category),
                (priority, &mut draft.priority),
                (due, &mut draft.due_date),
                (time, &mut draft.due_time),
                (remind, &mut draft.remind_minutes),
            ];
            for (value, slot) in fields {
                if let Some(value) = value {
                    *slot = value;
                }
            }
            if no_remind {
                draft.remind_minutes.clear();
            }
            let task = db.update_task(id, user.id, &draft.validate()?.into_patch())?;
            writeln!(out, "Task {} updated", id)?;
            writeln!(out, "{}", format_task_line(&task))?;
            Ok(())
        }
        Commands::Done { id, undo } => {
            let user = require_user(&auth, db)?;
            let patch = TaskPatch { completed: Some(!undo), ..Default::default() };
            let task = db.update_task(id, user.id, &patch)?;
            if task.completed {
                let mut dispatcher = Dispatcher::new(ConsolePlatform::new(&mut *out), config.reminders.sound);
                dispatcher.play_sound(SoundKind::Complete);
                writeln!(out, "Task {} done", id)?;
            } else {
                writeln!(out, "Task {} reopened", id)?;
            }
            Ok(())
        }
        Commands::Move { id, to } => {
            let user = require_user(&auth, db)?;
            let status: Status = to.parse()?;
            let task = db.get_task(id, user.id)?;
            match kanban::drop_into(&task, status) {
                Some(patch) => {
                    db.update_task(id, user.id, &patch)?;
                    writeln!(out, "Task {} moved to {}", id, status.label())?;
                }
                None => writeln!(out, "Task {} is already in {}", id, status.label())?,
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let user = require_user(&auth, db)?;
            db.delete_task(id, user.id)?;
            writeln!(out, "Task {} deleted", id)?;
            Ok(())
        }
        Commands::Subtask(command) => handle_subtask(command, &auth, db, out),
        Commands::Stats { json } => {
            let user = require_user(&auth, db)?;
            let tasks = db.list_tasks_by_owner(user.id)?;
            let stats = Statistics::compute(&tasks, Utc::now());
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                write_stats(&stats, out)?;
            }
            Ok(())
        }
        Commands::Watch { once } => handle_watch(&auth, db, config, once, out),
    }
}

fn require_user(auth: &Auth, db: &Database) -> Result<User, CliError> {
    auth.current_user(db)?.ok_or(CliError::NotSignedIn)
}

/// Use the flag value, or read one line from `input`
fn read_password(
    password: Option<String>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<String, CliError> {
    if let Some(password) = password {
        return Ok(password);
    }
    write!(out, "Password: ")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn handle_reset_password(
    auth: &mut Auth,
    db: &Database,
    email: Option<String>,
    token: Option<String>,
    password: Option<String>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if let Some(token) = token {
        let password = read_password(password, input, out)?;
        let user = auth.complete_password_reset(db, &token, &password)?;
        writeln!(out, "Password changed for {}", user.email)?;
        return Ok(());
    }

    let email = email.ok_or_else(|| {
        CliError::InvalidArgument("Give an email to request a reset, or --token to use one".to_string())
    })?;
    match auth.reset_password(db, &email)? {
        Some(token) => {
            writeln!(out, "Reset token (valid for one hour): {}", token)?;
            writeln!(out, "Run: taskboard reset-password --token {}", token)?;
        }
        None => writeln!(out, "If an account exists for {}, a reset token has been issued", email)?,
    }
    Ok(())
}

fn handle_subtask(
    command: SubtaskCommand,
    auth: &Auth,
    db: &Database,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let user = require_user(auth, db)?;
    match command {
        SubtaskCommand::Add { task_id, title } => {
            let title = title.trim();
            if title.is_empty() {
                return Err(CliError::InvalidArgument("Subtask title is required".to_string()));
            }
            let id = db.create_subtask(&Subtask::new(task_id, user.id, title.to_string()))?;
            writeln!(out, "Subtask created successfully (ID: {})", id)?;
        }
        SubtaskCommand::Toggle { id } => {
            let completed = db.toggle_subtask(id, user.id)?;
            writeln!(out, "Subtask {} {}", id, if completed { "done" } else { "open" })?;
        }
        SubtaskCommand::Delete { id } => {
            db.delete_subtask(id, user.id)?;
            writeln!(out, "Subtask {} deleted", id)?;
        }
    }
    Ok(())
}

fn handle_watch(
    auth: &Auth,
    db: &Database,
    config: &Config,
    once: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let user = require_user(auth, db)?;
    let persist = config.reminders.persist_notified;
    let interval = config.reminders.poll_interval();

    let mut scheduler = Scheduler::new(&config.reminders, ConsolePlatform::new(&mut *out), SystemClock);
    if persist {
        scheduler.seed(db.load_reminder_log(user.id)?);
    }
    scheduler.start();
    if !scheduler.is_running() {
        drop(scheduler);
        writeln!(out, "Reminders are disabled in the config")?;
        return Ok(());
    }
    tracing::info!(user_id = user.id, "watching for reminders");

    loop {
        scheduler.set_tasks(&db.list_tasks_by_owner(user.id)?);
        for key in scheduler.poll() {
            if persist {
                db.record_reminder(&key, Utc::now())?;
            }
        }
        if once {
            break;
        }
        std::thread::sleep(scheduler.until_next().unwrap_or(interval));
    }
    Ok(())
}

/// `#12 [x] Title  (Work, High, due 2025-01-01 10:00, In Progress) 1/2`
pub fn format_task_line(task: &Task) -> String {
    let mut details = vec![task.category.label().to_string(), task.priority.label().to_string()];
    if let Some(due) = &task.due_at {
        details.push(format!("due {}", format_local(due)));
    }
    details.push(task.status.label().to_string());
    if let Some(lead) = task.remind_before_minutes {
        details.push(format!("remind {}m", lead));
    }

    let mut line = format!(
        "#{} [{}] {}  ({})",
        task.id.unwrap_or_default(),
        if task.completed { "x" } else { " " },
        task.title,
        details.join(", ")
    );
    let (done, total) = task.subtask_progress();
    if total > 0 {
        line.push_str(&format!(" {}/{}", done, total));
    }
    line
}

fn write_task_details(task: &Task, out: &mut impl Write) -> Result<(), CliError> {
    writeln!(out, "{}", format_task_line(task))?;
    if let Some(description) = &task.description {
        writeln!(out)?;
        writeln!(out, "{}", description)?;
    }
    if !task.subtasks.is_empty() {
        writeln!(out)?;
        for subtask in &task.subtasks {
            writeln!(
                out,
                "  - #{} [{}] {}",
                subtask.id.unwrap_or_default(),
                if subtask.completed { "x" } else { " " },
                subtask.title
            )?;
        }
    }
    Ok(())
}

fn write_stats(stats: &Statistics, out: &mut impl Write) -> Result<(), CliError> {
    writeln!(out, "Tasks:           {}", stats.total)?;
    writeln!(out, "Completed:       {}", stats.completed)?;
    writeln!(out, "Completion rate: {:.2}%", stats.completion_rate)?;
    writeln!(out, "Overdue:         {}", stats.overdue)?;
    writeln!(out, "Due today:       {}", stats.due_today)?;
    writeln!(out, "With reminder:   {}", stats.with_reminder)?;
    writeln!(out, "Subtasks:        {}/{}", stats.subtasks_done, stats.subtasks_total)?;
    writeln!(out)?;
    for (category, count) in &stats.by_category {
        writeln!(out, "  {:<10} {}", category.label(), count)?;
    }
    for (priority, count) in &stats.by_priority {
        writeln!(out, "  {:<10} {}", priority.label(), count)?;
    }
    Ok(())
}
