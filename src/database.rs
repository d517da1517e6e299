use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Subtask, Task, TaskPatch, User};
use crate::reminder::ReminderKey;
use crate::utils::parse_timestamp;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
    #[error("Task has no id; it must be created before it can be updated")]
    MissingId,
}

/// Stored login material for a user
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
    pub salt: String,
}

pub struct Database {
    conn: Connection,
}

const TASK_COLUMNS: &str = "id, user_id, title, description, category, priority, due_at, completed, status, remind_before_minutes, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, display_name, avatar_path, created_at";

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        tracing::debug!(path = %db_path.display(), "database opened");

        Ok(db)
    }

    /// Open a private in-memory database with the full schema
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                salt            TEXT NOT NULL,
                display_name    TEXT,
                avatar_path     TEXT,
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        // A single local session slot
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token           TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS password_resets (
                token           TEXT PRIMARY KEY,
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id                 INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title                   TEXT NOT NULL,
                description             TEXT,
                category                TEXT NOT NULL DEFAULT 'work',
                priority                TEXT NOT NULL DEFAULT 'medium',
                due_at                  TEXT,
                completed               INTEGER NOT NULL DEFAULT 0,
                status                  TEXT NOT NULL DEFAULT 'todo',
                remind_before_minutes   INTEGER,
                created_at              TEXT NOT NULL,
                updated_at              TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS subtasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id         INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL,
                title           TEXT NOT NULL,
                completed       INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        // Reminders already delivered. Semantic facts only, never timer handles.
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS reminder_log (
                task_id         INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                due_at          TEXT NOT NULL,
                lead_minutes    INTEGER NOT NULL,
                fired_at        TEXT NOT NULL,
                PRIMARY KEY (task_id, due_at, lead_minutes)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_due_at ON tasks(due_at)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subtasks_task_id ON subtasks(task_id)",
            [],
        )?;

        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ---------------------------------------------------------------- tasks

    /// Helper function to map a row to a Task (subtasks are loaded separately)
    fn row_to_task(row: &Row) -> Result<Task, rusqlite::Error> {
        let mut task = Task {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            category: parse_column(row, 4)?,
            priority: parse_column(row, 5)?,
            due_at: optional_timestamp(row, 6)?,
            completed: row.get::<_, i64>(7)? != 0,
            status: parse_column(row, 8)?,
            remind_before_minutes: row.get(9)?,
            created_at: timestamp(row, 10)?,
            updated_at: timestamp(row, 11)?,
            subtasks: Vec::new(),
        };
        task.normalize();
        Ok(task)
    }

    /// Insert a task and return its ID. The done/completed invariant is applied before writing.
    pub fn create_task(&self, task: &Task) -> Result<i64, DatabaseError> {
        let mut task = task.clone();
        task.normalize();
        self.conn.execute(
            "INSERT INTO tasks (user_id, title, description, category, priority, due_at, completed, status, remind_before_minutes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                task.user_id,
                task.title,
                task.description,
                task.category.as_str(),
                task.priority.as_str(),
                task.due_at.map(|d| d.to_rfc3339()),
                if task.completed { 1 } else { 0 },
                task.status.as_str(),
                task.remind_before_minutes,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(task_id = id, user_id = task.user_id, "task created");
        Ok(id)
    }

    /// Get a single task with its subtasks, scoped to its owner
    pub fn get_task(&self, id: i64, user_id: i64) -> Result<Task, DatabaseError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2");
        let task = self
            .conn
            .query_row(&sql, rusqlite::params![id, user_id], Self::row_to_task)
            .optional()?;
        let mut task = task.ok_or(DatabaseError::NotFound { kind: "Task", id })?;
        task.subtasks = self.list_subtasks(id)?;
        Ok(task)
    }

    /// All tasks of one owner with their subtasks, oldest first
    pub fn list_tasks_by_owner(&self, user_id: i64) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut tasks = stmt
            .query_map(rusqlite::params![user_id], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.task_id, s.user_id, s.title, s.completed, s.created_at
             FROM subtasks s JOIN tasks t ON t.id = s.task_id
             WHERE t.user_id = ?1 ORDER BY s.created_at ASC, s.id ASC",
        )?;
        let subtasks = stmt
            .query_map(rusqlite::params![user_id], Self::row_to_subtask)?
            .collect::<Result<Vec<_>, _>>()?;
        for subtask in subtasks {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == Some(subtask.task_id)) {
                task.subtasks.push(subtask);
            }
        }

        Ok(tasks)
    }

    /// Write every column of an existing task
    pub fn replace_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let id = task.id.ok_or(DatabaseError::MissingId)?;
        let mut task = task.clone();
        task.normalize();

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tasks SET title = ?1, description = ?2, category = ?3, priority = ?4, due_at = ?5,
             completed = ?6, status = ?7, remind_before_minutes = ?8, updated_at = ?9
             WHERE id = ?10 AND user_id = ?11",
            rusqlite::params![
                task.title,
                task.description,
                task.category.as_str(),
                task.priority.as_str(),
                task.due_at.map(|d| d.to_rfc3339()),
                if task.completed { 1 } else { 0 },
                task.status.as_str(),
                task.remind_before_minutes,
                task.updated_at.to_rfc3339(),
                id,
                task.user_id,
            ],
        )?;
        tx.commit()?;

        if changed == 0 {
            return Err(DatabaseError::NotFound { kind: "Task", id });
        }
        Ok(())
    }

    /// Apply a partial update and return the stored result
    pub fn update_task(&self, id: i64, user_id: i64, patch: &TaskPatch) -> Result<Task, DatabaseError> {
        let mut task = self.get_task(id, user_id)?;
        patch.apply(&mut task);
        self.replace_task(&task)?;
        tracing::debug!(task_id = id, status = %task.status, "task updated");
        Ok(task)
    }

    /// Delete a task and its subtasks
    pub fn delete_task(&self, id: i64, user_id: i64) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM subtasks WHERE task_id = ?1 AND task_id IN (SELECT id FROM tasks WHERE user_id = ?2)",
            rusqlite::params![id, user_id],
        )?;
        let changed = tx.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;
        tx.commit()?;

        if changed == 0 {
            return Err(DatabaseError::NotFound { kind: "Task", id });
        }
        tracing::debug!(task_id = id, "task deleted");
        Ok(())
    }

    // ------------------------------------------------------------- subtasks

    fn row_to_subtask(row: &Row) -> Result<Subtask, rusqlite::Error> {
        Ok(Subtask {
            id: Some(row.get(0)?),
            task_id: row.get(1)?,
            user_id: row.get(2)?,
            title: row.get(3)?,
            completed: row.get::<_, i64>(4)? != 0,
            created_at: timestamp(row, 5)?,
        })
    }

    /// Insert a subtask; the parent task must belong to the same user
    pub fn create_subtask(&self, subtask: &Subtask) -> Result<i64, DatabaseError> {
        let owner: Option<i64> = self
            .conn
            .query_row(
                "SELECT user_id FROM tasks WHERE id = ?1",
                rusqlite::params![subtask.task_id],
                |row| row.get(0),
            )
            .optional()?;
        if owner != Some(subtask.user_id) {
            return Err(DatabaseError::NotFound { kind: "Task", id: subtask.task_id });
        }

        self.conn.execute(
            "INSERT INTO subtasks (task_id, user_id, title, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                subtask.task_id,
                subtask.user_id,
                subtask.title,
                if subtask.completed { 1 } else { 0 },
                subtask.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_subtasks(&self, task_id: i64) -> Result<Vec<Subtask>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, user_id, title, completed, created_at
             FROM subtasks WHERE task_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let subtasks = stmt
            .query_map(rusqlite::params![task_id], Self::row_to_subtask)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subtasks)
    }

    /// Flip a subtask's completion flag and return the new value
    pub fn toggle_subtask(&self, id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE subtasks SET completed = 1 - completed WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound { kind: "Subtask", id });
        }
        let completed: i64 = tx.query_row(
            "SELECT completed FROM subtasks WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(completed != 0)
    }

    pub fn delete_subtask(&self, id: i64, user_id: i64) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "DELETE FROM subtasks WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;
        tx.commit()?;
        if changed == 0 {
            return Err(DatabaseError::NotFound { kind: "Subtask", id });
        }
        Ok(())
    }

    // ---------------------------------------------------------------- users

    fn row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            avatar_path: row.get(3)?,
            created_at: timestamp(row, 4)?,
        })
    }

    pub fn insert_user(&self, email: &str, password_hash: &str, salt: &str) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO users (email, password_hash, salt, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![email, password_hash, salt, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<User, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        self.conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_user)
            .optional()?
            .ok_or(DatabaseError::NotFound { kind: "User", id })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = self
            .conn
            .query_row(&sql, rusqlite::params![email], Self::row_to_user)
            .optional()?;
        Ok(user)
    }

    pub fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash, salt FROM users WHERE email = ?1");
        let creds = self
            .conn
            .query_row(&sql, rusqlite::params![email], |row| {
                Ok(Credentials {
                    user: Self::row_to_user(row)?,
                    password_hash: row.get(5)?,
                    salt: row.get(6)?,
                })
            })
            .optional()?;
        Ok(creds)
    }

    pub fn update_password(&self, user_id: i64, password_hash: &str, salt: &str) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE users SET password_hash = ?1, salt = ?2 WHERE id = ?3",
            rusqlite::params![password_hash, salt, user_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound { kind: "User", id: user_id });
        }
        Ok(())
    }

    pub fn update_profile(
        &self,
        user_id: i64,
        display_name: Option<&str>,
        avatar_path: Option<&str>,
    ) -> Result<User, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE users SET display_name = ?1, avatar_path = ?2 WHERE id = ?3",
            rusqlite::params![display_name, avatar_path, user_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound { kind: "User", id: user_id });
        }
        self.get_user(user_id)
    }

    // ------------------------------------------------------------- sessions

    pub fn set_session(&self, user_id: i64, token: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions (id, user_id, token, created_at) VALUES (1, ?1, ?2, ?3)",
            rusqlite::params![user_id, token, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn clear_session(&self) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }

    pub fn session_user_id(&self) -> Result<Option<i64>, DatabaseError> {
        let id = self
            .conn
            .query_row("SELECT user_id FROM sessions WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    pub fn insert_password_reset(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO password_resets (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![token, user_id, expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Remove a reset token and return its user and expiry. Tokens are single use.
    pub fn take_password_reset(&self, token: &str) -> Result<Option<(i64, DateTime<Utc>)>, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let row = tx
            .query_row(
                "SELECT user_id, expires_at FROM password_resets WHERE token = ?1",
                rusqlite::params![token],
                |row| Ok((row.get::<_, i64>(0)?, timestamp(row, 1)?)),
            )
            .optional()?;
        tx.execute("DELETE FROM password_resets WHERE token = ?1", rusqlite::params![token])?;
        tx.commit()?;
        Ok(row)
    }

    // --------------------------------------------------------- reminder log

    /// Reminders already delivered for one owner's tasks
    pub fn load_reminder_log(&self, user_id: i64) -> Result<Vec<ReminderKey>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.task_id, r.due_at, r.lead_minutes
             FROM reminder_log r JOIN tasks t ON t.id = r.task_id
             WHERE t.user_id = ?1",
        )?;
        let keys = stmt
            .query_map(rusqlite::params![user_id], |row| {
                Ok(ReminderKey {
                    task_id: row.get(0)?,
                    due_at: timestamp(row, 1)?,
                    lead_minutes: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    pub fn record_reminder(&self, key: &ReminderKey, fired_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO reminder_log (task_id, due_at, lead_minutes, fired_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                key.task_id,
                key.due_at.to_rfc3339(),
                key.lead_minutes,
                fired_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// Read a TEXT column through `FromStr` (enum columns)
fn parse_column<T>(row: &Row, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: String = row.get(idx)?;
    value.parse().map_err(|e| conversion_error(idx, e))
}

#[derive(Debug, Error)]
#[error("invalid timestamp '{0}'")]
struct BadTimestamp(String);

fn timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let value: String = row.get(idx)?;
    parse_timestamp(&value).ok_or_else(|| conversion_error(idx, BadTimestamp(value)))
}

fn optional_timestamp(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let value: Option<String> = row.get(idx)?;
    match value {
        Some(v) => parse_timestamp(&v)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, BadTimestamp(v))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Status};
    use chrono::TimeZone;

    fn db_with_user() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let uid = db.insert_user("ana@example.com", "hash", "salt").unwrap();
        (db, uid)
    }

    #[test]
    fn create_and_list_by_owner() {
        let (db, uid) = db_with_user();
        let other = db.insert_user("bob@example.com", "hash", "salt").unwrap();

        let mut task = Task::new(uid, "Write report".to_string());
        task.category = Category::Personal;
        task.due_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap());
        task.remind_before_minutes = Some(30);
        let id = db.create_task(&task).unwrap();
        db.create_task(&Task::new(other, "Not mine".to_string())).unwrap();

        let tasks = db.list_tasks_by_owner(uid).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, Some(id));
        assert_eq!(tasks[0].category, Category::Personal);
        assert_eq!(tasks[0].due_at, task.due_at);
        assert_eq!(tasks[0].remind_before_minutes, Some(30));
    }

    #[test]
    fn owner_scoping_hides_other_users_tasks() {
        let (db, uid) = db_with_user();
        let other = db.insert_user("bob@example.com", "hash", "salt").unwrap();
        let id = db.create_task(&Task::new(uid, "Private".to_string())).unwrap();

        assert!(matches!(db.get_task(id, other), Err(DatabaseError::NotFound { .. })));
        assert!(matches!(db.delete_task(id, other), Err(DatabaseError::NotFound { .. })));
        assert!(db.get_task(id, uid).is_ok());
    }

    #[test]
    fn update_enforces_done_invariant() {
        let (db, uid) = db_with_user();
        let id = db.create_task(&Task::new(uid, "Ship".to_string())).unwrap();

        let patch = TaskPatch { status: Some(Status::Done), ..Default::default() };
        let task = db.update_task(id, uid, &patch).unwrap();
        assert!(task.completed);

        let patch = TaskPatch { completed: Some(false), ..Default::default() };
        let task = db.update_task(id, uid, &patch).unwrap();
        assert_eq!(task.status, Status::Todo);

        let stored = db.get_task(id, uid).unwrap();
        assert_eq!(stored.status, Status::Todo);
        assert!(!stored.completed);
    }

    #[test]
    fn inconsistent_task_is_normalized_on_write() {
        let (db, uid) = db_with_user();
        let mut task = Task::new(uid, "Odd".to_string());
        task.completed = true;
        task.status = Status::InProgress;
        let id = db.create_task(&task).unwrap();
        assert_eq!(db.get_task(id, uid).unwrap().status, Status::Done);
    }

    #[test]
    fn deleting_task_cascades_to_subtasks() {
        let (db, uid) = db_with_user();
        let id = db.create_task(&Task::new(uid, "Trip".to_string())).unwrap();
        let sub = db.create_subtask(&Subtask::new(id, uid, "Pack".to_string())).unwrap();
        db.create_subtask(&Subtask::new(id, uid, "Tickets".to_string())).unwrap();

        assert!(db.toggle_subtask(sub, uid).unwrap());
        let task = db.get_task(id, uid).unwrap();
        assert_eq!(task.subtask_progress(), (1, 2));

        db.delete_task(id, uid).unwrap();
        assert!(db.list_subtasks(id).unwrap().is_empty());
    }

    #[test]
    fn subtask_requires_owned_parent() {
        let (db, uid) = db_with_user();
        let other = db.insert_user("bob@example.com", "hash", "salt").unwrap();
        let id = db.create_task(&Task::new(uid, "Mine".to_string())).unwrap();
        let result = db.create_subtask(&Subtask::new(id, other, "Sneaky".to_string()));
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn session_slot_holds_one_user() {
        let (db, uid) = db_with_user();
        assert_eq!(db.session_user_id().unwrap(), None);
        db.set_session(uid, "t1").unwrap();
        db.set_session(uid, "t2").unwrap();
        assert_eq!(db.session_user_id().unwrap(), Some(uid));
        db.clear_session().unwrap();
        assert_eq!(db.session_user_id().unwrap(), None);
    }

    #[test]
    fn reset_tokens_are_single_use() {
        let (db, uid) = db_with_user();
        let expires = Utc::now() + chrono::Duration::hours(1);
        db.insert_password_reset("tok", uid, expires).unwrap();
        assert_eq!(db.take_password_reset("tok").unwrap().map(|(u, _)| u), Some(uid));
        assert!(db.take_password_reset("tok").unwrap().is_none());
    }

    #[test]
    fn reminder_log_round_trip_and_cascade() {
        let (db, uid) = db_with_user();
        let id = db.create_task(&Task::new(uid, "Call".to_string())).unwrap();
        let key = ReminderKey {
            task_id: id,
            due_at: Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
            lead_minutes: 15,
        };
        db.record_reminder(&key, Utc::now()).unwrap();
        db.record_reminder(&key, Utc::now()).unwrap();
        assert_eq!(db.load_reminder_log(uid).unwrap(), vec![key]);

        db.delete_task(id, uid).unwrap();
        assert!(db.load_reminder_log(uid).unwrap().is_empty());
    }

    #[test]
    fn opens_file_database_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        let uid = db.insert_user("c@example.com", "h", "s").unwrap();
        db.create_task(&Task::new(uid, "Persisted".to_string())).unwrap();
        drop(db);

        let db = Database::new(path.to_str().unwrap()).unwrap();
        assert_eq!(db.list_tasks_by_owner(uid).unwrap().len(), 1);
    }
}
