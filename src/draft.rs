use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Category, Priority, Task, TaskPatch};
use crate::utils::{end_of_day, local_to_utc, parse_date, parse_time, split_local};

/// Longest reminder lead time accepted from a form: one week
pub const MAX_REMIND_MINUTES: u32 = 7 * 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Due date is required")]
    MissingDueDate,
    #[error("Invalid due date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("Invalid due time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("Due date and time do not exist in the local timezone")]
    NonexistentLocalTime,
    #[error("Invalid reminder '{0}' (expected minutes between 1 and {MAX_REMIND_MINUTES})")]
    InvalidReminder(String),
    #[error("{0}")]
    UnknownValue(String),
}

/// Raw, unvalidated form input for a task
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub due_date: String,
    pub due_time: String,
    pub remind_minutes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTask {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub due_at: DateTime<Utc>,
    pub remind_before_minutes: Option<u32>,
}

impl TaskDraft {
    /// Prefill a draft from an existing task (edit form)
    pub fn from_task(task: &Task) -> Self {
        let (due_date, due_time) = task
            .due_at
            .as_ref()
            .map(split_local)
            .unwrap_or_default();
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            category: task.category.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            due_date,
            due_time,
            remind_minutes: task
                .remind_before_minutes
                .map(|m| m.to_string())
                .unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedTask, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        let date_str = self.due_date.trim();
        if date_str.is_empty() {
            return Err(ValidationError::MissingDueDate);
        }
        let date = parse_date(date_str).map_err(|_| ValidationError::InvalidDate(date_str.to_string()))?;

        let time_str = self.due_time.trim();
        let time = if time_str.is_empty() {
            end_of_day()
        } else {
            parse_time(time_str).map_err(|_| ValidationError::InvalidTime(time_str.to_string()))?
        };
        let due_at = local_to_utc(date, time).ok_or(ValidationError::NonexistentLocalTime)?;

        let category = parse_or_default(&self.category, Category::Work)?;
        let priority = parse_or_default(&self.priority, Priority::Medium)?;
        let remind_before_minutes = parse_remind_minutes(&self.remind_minutes)?;

        let description = self.description.trim();
        Ok(ValidatedTask {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            category,
            priority,
            due_at,
            remind_before_minutes,
        })
    }
}

fn parse_or_default<T>(value: &str, default: T) -> Result<T, ValidationError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(default);
    }
    value
        .parse()
        .map_err(|e: T::Err| ValidationError::UnknownValue(e.to_string()))
}

/// Empty input means "no reminder"
pub fn parse_remind_minutes(value: &str) -> Result<Option<u32>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<u32>() {
        Ok(m) if (1..=MAX_REMIND_MINUTES).contains(&m) => Ok(Some(m)),
        _ => Err(ValidationError::InvalidReminder(value.to_string())),
    }
}

impl ValidatedTask {
    pub fn into_task(self, user_id: i64) -> Task {
        let mut task = Task::new(user_id, self.title);
        task.description = self.description;
        task.category = self.category;
        task.priority = self.priority;
        task.due_at = Some(self.due_at);
        task.remind_before_minutes = self.remind_before_minutes;
        task
    }

    /// Patch that overwrites every form-editable field of an existing task
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title),
            description: Some(self.description),
            category: Some(self.category),
            priority: Some(self.priority),
            due_at: Some(Some(self.due_at)),
            remind_before_minutes: Some(self.remind_before_minutes),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TaskDraft {
        TaskDraft {
            title: "  Pay rent ".to_string(),
            due_date: "2025-02-01".to_string(),
            due_time: "09:00".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_draft_uses_form_defaults() {
        let valid = draft().validate().unwrap();
        assert_eq!(valid.title, "Pay rent");
        assert_eq!(valid.category, Category::Work);
        assert_eq!(valid.priority, Priority::Medium);
        assert_eq!(valid.description, None);
        assert_eq!(valid.remind_before_minutes, None);
    }

    #[test]
    fn due_date_is_required() {
        let mut d = draft();
        d.due_date = "   ".to_string();
        assert_eq!(d.validate(), Err(ValidationError::MissingDueDate));
    }

    #[test]
    fn title_is_required() {
        let mut d = draft();
        d.title.clear();
        assert_eq!(d.validate(), Err(ValidationError::MissingTitle));
    }

    #[test]
    fn missing_time_defaults_to_end_of_day() {
        let mut d = draft();
        d.due_time.clear();
        let valid = d.validate().unwrap();
        let (_, time) = split_local(&valid.due_at);
        assert_eq!(time, "23:59");
    }

    #[test]
    fn rejects_bad_fields() {
        let mut d = draft();
        d.due_date = "01/02/2025".to_string();
        assert!(matches!(d.validate(), Err(ValidationError::InvalidDate(_))));

        let mut d = draft();
        d.due_time = "9am".to_string();
        assert!(matches!(d.validate(), Err(ValidationError::InvalidTime(_))));

        let mut d = draft();
        d.remind_minutes = "0".to_string();
        assert!(matches!(d.validate(), Err(ValidationError::InvalidReminder(_))));

        let mut d = draft();
        d.category = "urgent".to_string();
        assert!(matches!(d.validate(), Err(ValidationError::UnknownValue(_))));
    }

    #[test]
    fn edit_form_round_trips_existing_task() {
        let mut d = draft();
        d.category = "shopping".to_string();
        d.priority = "high".to_string();
        d.remind_minutes = "30".to_string();
        d.description = "monthly".to_string();
        let task = d.validate().unwrap().into_task(7);
        let again = TaskDraft::from_task(&task).validate().unwrap();
        assert_eq!(again.title, "Pay rent");
        assert_eq!(again.category, Category::Shopping);
        assert_eq!(again.priority, Priority::High);
        assert_eq!(again.remind_before_minutes, Some(30));
        assert_eq!(again.due_at, task.due_at.unwrap());
    }
}
