//! The task filter shown in the filters box and the filter modal.
//!
//! Each dimension is a closed enum with an `All` sentinel so an unset filter
//! is a real value rather than an empty string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Category, Priority, Status, Task, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    /// Anything not completed
    Active,
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub category: CategoryFilter,
    pub priority: PriorityFilter,
    pub status: StatusFilter,
}

impl CategoryFilter {
    pub fn options() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::ALL.iter().copied().map(CategoryFilter::Only))
            .collect()
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Only(c) => c.label(),
        }
    }
}

impl PriorityFilter {
    pub fn options() -> Vec<PriorityFilter> {
        std::iter::once(PriorityFilter::All)
            .chain(Priority::ALL.iter().copied().map(PriorityFilter::Only))
            .collect()
    }

    pub fn matches(&self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => *p == priority,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriorityFilter::All => "All",
            PriorityFilter::Only(p) => p.label(),
        }
    }
}

impl StatusFilter {
    pub fn options() -> Vec<StatusFilter> {
        vec![
            StatusFilter::All,
            StatusFilter::Active,
            StatusFilter::Todo,
            StatusFilter::InProgress,
            StatusFilter::Done,
        ]
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Todo => task.status == Status::Todo,
            StatusFilter::InProgress => task.status == Status::InProgress,
            StatusFilter::Done => task.completed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Active => "Active",
            StatusFilter::Todo => "To Do",
            StatusFilter::InProgress => "In Progress",
            StatusFilter::Done => "Done",
        }
    }
}

/// Step through a closed list of options, wrapping at both ends
pub fn cycle<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
    let Some(pos) = options.iter().position(|o| *o == current) else {
        return options.first().copied().unwrap_or(current);
    };
    let len = options.len();
    let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
    options[next]
}

impl TaskFilter {
    pub fn is_active(&self) -> bool {
        *self != TaskFilter::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.category.matches(task.category)
            && self.priority.matches(task.priority)
            && self.status.matches(task)
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }

    /// One-line description for the filters box
    pub fn summary(&self) -> String {
        if !self.is_active() {
            return "No filters (showing all tasks)".to_string();
        }
        let mut parts = Vec::new();
        if self.category != CategoryFilter::All {
            parts.push(format!("Category: {}", self.category.label()));
        }
        if self.priority != PriorityFilter::All {
            parts.push(format!("Priority: {}", self.priority.label()));
        }
        if self.status != StatusFilter::All {
            parts.push(format!("Status: {}", self.status.label()));
        }
        parts.join(" | ")
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl FromStr for PriorityFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        s.parse().map(PriorityFilter::Only)
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Done),
            other => match other.parse::<Status>() {
                Ok(Status::Todo) => Ok(StatusFilter::Todo),
                Ok(Status::InProgress) => Ok(StatusFilter::InProgress),
                Ok(Status::Done) => Ok(StatusFilter::Done),
                Err(_) => Err(UnknownVariant { kind: "status filter", value: s.to_string() }),
            },
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, category: Category, priority: Priority, status: Status) -> Task {
        let mut t = Task::new(1, title.to_string());
        t.category = category;
        t.priority = priority;
        t.set_status(status);
        t
    }

    fn sample() -> Vec<Task> {
        vec![
            task("report", Category::Work, Priority::High, Status::InProgress),
            task("groceries", Category::Shopping, Priority::Low, Status::Todo),
            task("gym", Category::Personal, Priority::Medium, Status::Done),
            task("standup", Category::Work, Priority::Medium, Status::Done),
        ]
    }

    #[test]
    fn default_filter_matches_everything() {
        let tasks = sample();
        let filter = TaskFilter::default();
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&tasks).len(), 4);
        assert_eq!(filter.summary(), "No filters (showing all tasks)");
    }

    #[test]
    fn dimensions_combine_with_and() {
        let tasks = sample();
        let filter = TaskFilter {
            category: CategoryFilter::Only(Category::Work),
            priority: PriorityFilter::All,
            status: StatusFilter::Done,
        };
        let titles: Vec<_> = filter.apply(&tasks).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["standup"]);
        assert_eq!(filter.summary(), "Category: Work | Status: Done");
    }

    #[test]
    fn active_excludes_completed() {
        let tasks = sample();
        let filter = TaskFilter { status: StatusFilter::Active, ..Default::default() };
        let titles: Vec<_> = filter.apply(&tasks).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["report", "groceries"]);
    }

    #[test]
    fn cycle_wraps_both_directions() {
        let options = CategoryFilter::options();
        assert_eq!(cycle(&options, CategoryFilter::All, false), CategoryFilter::Only(Category::Other));
        assert_eq!(cycle(&options, CategoryFilter::Only(Category::Other), true), CategoryFilter::All);
        assert_eq!(cycle(&StatusFilter::options(), StatusFilter::All, true), StatusFilter::Active);
    }

    #[test]
    fn parses_cli_values() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("Work".parse::<CategoryFilter>().unwrap(), CategoryFilter::Only(Category::Work));
        assert_eq!("high".parse::<PriorityFilter>().unwrap(), PriorityFilter::Only(Priority::High));
        assert_eq!("completed".parse::<StatusFilter>().unwrap(), StatusFilter::Done);
        assert_eq!("in-progress".parse::<StatusFilter>().unwrap(), StatusFilter::InProgress);
        assert!("urgent".parse::<CategoryFilter>().is_err());
    }
}
