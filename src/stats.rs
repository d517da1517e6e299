use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Category, Priority, Status, Task};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    /// Percentage rounded to two decimals; 0 with no tasks
    pub completion_rate: f64,
    pub by_category: BTreeMap<Category, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_status: BTreeMap<Status, usize>,
    pub overdue: usize,
    pub due_today: usize,
    pub with_reminder: usize,
    pub subtasks_done: usize,
    pub subtasks_total: usize,
}

impl Statistics {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();

        let mut by_category = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        let mut by_status = BTreeMap::new();
        let mut subtasks_done = 0;
        let mut subtasks_total = 0;
        for task in tasks {
            *by_category.entry(task.category).or_insert(0) += 1;
            *by_priority.entry(task.priority).or_insert(0) += 1;
            *by_status.entry(task.status).or_insert(0) += 1;
            let (done, all) = task.subtask_progress();
            subtasks_done += done;
            subtasks_total += all;
        }

        Self {
            total,
            completed,
            completion_rate: completion_rate(completed, total),
            by_category,
            by_priority,
            by_status,
            overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
            due_today: tasks
                .iter()
                .filter(|t| t.due_at.is_some_and(|d| d.with_timezone(&Local).date_naive() == today))
                .count(),
            with_reminder: tasks.iter().filter(|t| t.notify_at().is_some()).count(),
            subtasks_done,
            subtasks_total,
        }
    }

    pub fn category_count(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn priority_count(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }

    pub fn status_count(&self, status: Status) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = completed as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subtask;
    use chrono::Duration;

    #[test]
    fn empty_list_has_zero_rate() {
        let stats = Statistics::compute(&[], Utc::now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn counts_and_rate() {
        let now = Utc::now();
        let mut a = Task::new(1, "a".to_string());
        a.category = Category::Personal;
        a.set_completed(true);
        let mut b = Task::new(1, "b".to_string());
        b.priority = Priority::High;
        b.due_at = Some(now - Duration::hours(1));
        b.remind_before_minutes = Some(10);
        b.subtasks = vec![Subtask::new(2, 1, "x".to_string()), {
            let mut s = Subtask::new(2, 1, "y".to_string());
            s.completed = true;
            s
        }];
        let mut c = Task::new(1, "c".to_string());
        c.set_status(Status::InProgress);

        let stats = Statistics::compute(&[a, b, c], now);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.completion_rate, 33.33);
        assert_eq!(stats.category_count(Category::Work), 2);
        assert_eq!(stats.category_count(Category::Personal), 1);
        assert_eq!(stats.category_count(Category::Shopping), 0);
        assert_eq!(stats.priority_count(Priority::High), 1);
        assert_eq!(stats.status_count(Status::InProgress), 1);
        assert_eq!(stats.status_count(Status::Done), 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.with_reminder, 1);
        assert_eq!((stats.subtasks_done, stats.subtasks_total), (1, 2));
    }

    #[test]
    fn two_thirds_rounds_to_two_decimals() {
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(1, 1), 100.0);
    }
}
