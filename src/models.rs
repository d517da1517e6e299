use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personal,
    Work,
    Shopping,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Kanban status of a task. `Done` always goes together with `completed = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Work,
        Category::Shopping,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Personal => "Personal",
            Category::Work => "Work",
            Category::Shopping => "Shopping",
            Category::Other => "Other",
        }
    }
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(Category::Personal),
            "work" => Ok(Category::Work),
            "shopping" => Ok(Category::Shopping),
            "other" => Ok(Category::Other),
            _ => Err(UnknownVariant { kind: "category", value: s.to_string() }),
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(UnknownVariant { kind: "priority", value: s.to_string() }),
        }
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "inProgress" is accepted for imported rows
        match s.trim().to_lowercase().as_str() {
            "todo" => Ok(Status::Todo),
            "in-progress" | "inprogress" | "in_progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            _ => Err(UnknownVariant { kind: "status", value: s.to_string() }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub status: Status,
    pub remind_before_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn new(user_id: i64, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id,
            title,
            description: None,
            category: Category::Work,
            priority: Priority::Medium,
            due_at: None,
            completed: false,
            status: Status::Todo,
            remind_before_minutes: None,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        }
    }

    /// Set the status and keep `completed` in step with it.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        self.completed = status == Status::Done;
    }

    /// Set the completion flag and keep `status` in step with it.
    /// Reopening a done task puts it back in the `todo` column.
    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        if completed {
            self.status = Status::Done;
        } else if self.status == Status::Done {
            self.status = Status::Todo;
        }
    }

    pub fn toggle_completed(&mut self) {
        self.set_completed(!self.completed);
    }

    /// Repair a task whose status and completion flag disagree.
    /// `completed` wins.
    pub fn normalize(&mut self) {
        if self.completed {
            self.status = Status::Done;
        } else if self.status == Status::Done {
            self.status = Status::Todo;
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now)
    }

    /// Instant at which a reminder should fire, if the task has both a due time and a lead time.
    pub fn notify_at(&self) -> Option<DateTime<Utc>> {
        let due = self.due_at?;
        let lead = self.remind_before_minutes?;
        Some(due - chrono::Duration::minutes(i64::from(lead)))
    }

    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Option<i64>,
    pub task_id: i64,
    pub user_id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    pub fn new(task_id: i64, user_id: i64, title: String) -> Self {
        Self {
            id: None,
            task_id,
            user_id,
            title,
            completed: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Partial update of a task. `None` leaves a field unchanged; for the
/// clearable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub status: Option<Status>,
    pub completed: Option<bool>,
    pub remind_before_minutes: Option<Option<u32>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Apply the patch. When both `status` and `completed` are given, `completed` is applied
    /// last and wins.
    pub fn apply(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_at) = self.due_at {
            task.due_at = due_at;
        }
        if let Some(remind) = self.remind_before_minutes {
            task.remind_before_minutes = remind;
        }
        if let Some(status) = self.status {
            task.set_status(status);
        }
        if let Some(completed) = self.completed {
            task.set_completed(completed);
        }
        task.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn set_status_keeps_completed_in_step() {
        let mut task = Task::new(1, "Write report".to_string());
        task.set_status(Status::Done);
        assert!(task.completed);
        task.set_status(Status::InProgress);
        assert!(!task.completed);
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn reopening_done_task_moves_it_back_to_todo() {
        let mut task = Task::new(1, "Buy milk".to_string());
        task.set_status(Status::InProgress);
        task.set_completed(true);
        assert_eq!(task.status, Status::Done);
        task.toggle_completed();
        assert_eq!(task.status, Status::Todo);
        assert!(!task.completed);
    }

    #[test]
    fn reopening_in_progress_task_keeps_its_column() {
        let mut task = Task::new(1, "Refactor".to_string());
        task.set_status(Status::InProgress);
        task.set_completed(false);
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn normalize_repairs_inconsistent_rows() {
        let mut task = Task::new(1, "Legacy".to_string());
        task.completed = true;
        task.status = Status::InProgress;
        task.normalize();
        assert_eq!(task.status, Status::Done);

        let mut task = Task::new(1, "Legacy 2".to_string());
        task.completed = false;
        task.status = Status::Done;
        task.normalize();
        assert!(!task.completed);
        assert_eq!(task.status, Status::Todo);
    }

    #[test]
    fn notify_at_requires_due_and_lead() {
        let mut task = Task::new(1, "Call".to_string());
        assert_eq!(task.notify_at(), None);
        let due = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        task.due_at = Some(due);
        assert_eq!(task.notify_at(), None);
        task.remind_before_minutes = Some(30);
        assert_eq!(task.notify_at(), Some(Utc.with_ymd_and_hms(2025, 1, 1, 9, 30, 0).unwrap()));
    }

    #[test]
    fn patch_completed_wins_over_status() {
        let mut task = Task::new(1, "Deploy".to_string());
        let patch = TaskPatch {
            completed: Some(true),
            status: Some(Status::InProgress),
            ..Default::default()
        };
        patch.apply(&mut task);
        assert_eq!(task.status, Status::Done);
        assert!(task.completed);

        let reopen = TaskPatch {
            completed: Some(false),
            status: Some(Status::Done),
            ..Default::default()
        };
        reopen.apply(&mut task);
        assert_eq!(task.status, Status::Todo);
        assert!(!task.completed);
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let mut task = Task::new(1, "Dentist".to_string());
        task.description = Some("bring card".to_string());
        task.remind_before_minutes = Some(15);
        let patch = TaskPatch {
            description: Some(None),
            remind_before_minutes: Some(None),
            ..Default::default()
        };
        patch.apply(&mut task);
        assert_eq!(task.description, None);
        assert_eq!(task.remind_before_minutes, None);
    }

    #[test]
    fn status_parses_legacy_spelling() {
        assert_eq!("inProgress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
        assert!("later".parse::<Status>().is_err());
    }

    #[test]
    fn is_overdue_ignores_completed_tasks() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let mut task = Task::new(1, "Old".to_string());
        task.due_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(task.is_overdue(now));
        task.set_completed(true);
        assert!(!task.is_overdue(now));
    }
}
