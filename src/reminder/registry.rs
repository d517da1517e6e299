//! Which reminders have already fired.
//!
//! A reminder is identified by the task, its due time and its lead time, so editing
//! either of the latter arms a fresh reminder. Each key moves from pending to notified
//! exactly once; only [`ReminderRegistry::reset`] forgets.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ReminderConfig;
use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderKey {
    pub task_id: i64,
    pub due_at: DateTime<Utc>,
    pub lead_minutes: u32,
}

impl ReminderKey {
    /// None unless the task is stored and has both a due time and a lead time
    pub fn for_task(task: &Task) -> Option<Self> {
        Some(Self {
            task_id: task.id?,
            due_at: task.due_at?,
            lead_minutes: task.remind_before_minutes?,
        })
    }

    pub fn notify_at(&self) -> DateTime<Utc> {
        self.due_at - Duration::minutes(i64::from(self.lead_minutes))
    }
}

/// Tolerance around `notify_at` inside which a poll tick may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub early: Duration,
    pub late: Duration,
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self {
            early: Duration::seconds(30),
            late: Duration::seconds(60),
        }
    }
}

impl ReminderWindow {
    pub fn from_config(config: &ReminderConfig) -> Self {
        // capped at a day
        let secs = |s: u64| Duration::seconds(s.min(86_400) as i64);
        Self {
            early: secs(config.window_early_secs),
            late: secs(config.window_late_secs),
        }
    }

    /// `now ∈ [notify_at - early, notify_at + late]`
    pub fn contains(&self, notify_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= notify_at - self.early && now <= notify_at + self.late
    }
}

#[derive(Debug, Default)]
pub struct ReminderRegistry {
    window: ReminderWindow,
    notified: HashSet<ReminderKey>,
}

impl ReminderRegistry {
    pub fn new(window: ReminderWindow) -> Self {
        Self {
            window,
            notified: HashSet::new(),
        }
    }

    pub fn window(&self) -> ReminderWindow {
        self.window
    }

    /// True when the task is open, has a reminder configured, the clock is inside its
    /// window and that reminder has not fired yet.
    pub fn should_notify(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if task.completed {
            return false;
        }
        let Some(key) = ReminderKey::for_task(task) else {
            return false;
        };
        !self.notified.contains(&key) && self.window.contains(key.notify_at(), now)
    }

    /// Record the task's current reminder as delivered. Returns false if it already was
    /// (or the task has no reminder).
    pub fn mark_notified(&mut self, task: &Task) -> bool {
        match ReminderKey::for_task(task) {
            Some(key) => self.notified.insert(key),
            None => false,
        }
    }

    /// Restore previously delivered reminders
    pub fn seed(&mut self, keys: impl IntoIterator<Item = ReminderKey>) {
        self.notified.extend(keys);
    }

    /// Delivered reminders, sorted
    pub fn keys(&self) -> Vec<ReminderKey> {
        let mut keys: Vec<_> = self.notified.iter().copied().collect();
        keys.sort();
        keys
    }

    /// Forget markers of tasks that are gone
    pub fn retain_tasks(&mut self, task_ids: &HashSet<i64>) {
        self.notified.retain(|k| task_ids.contains(&k.task_id));
    }

    pub fn reset(&mut self) {
        self.notified.clear();
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, s).unwrap()
    }

    fn task(lead: Option<u32>) -> Task {
        let mut task = Task::new(1, "Dentist".to_string());
        task.id = Some(10);
        task.due_at = Some(at(10, 0, 0));
        task.remind_before_minutes = lead;
        task
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let registry = ReminderRegistry::default();
        let t = task(Some(30));
        assert!(!registry.should_notify(&t, at(9, 29, 29)));
        assert!(registry.should_notify(&t, at(9, 29, 30)));
        assert!(registry.should_notify(&t, at(9, 31, 0)));
        assert!(!registry.should_notify(&t, at(9, 31, 1)));
    }

    #[test]
    fn completed_or_unconfigured_tasks_never_notify() {
        let registry = ReminderRegistry::default();
        let mut done = task(Some(30));
        done.set_completed(true);
        assert!(!registry.should_notify(&done, at(9, 30, 0)));

        assert!(!registry.should_notify(&task(None), at(9, 30, 0)));

        let mut no_due = task(Some(30));
        no_due.due_at = None;
        assert!(!registry.should_notify(&no_due, at(9, 30, 0)));

        let mut unsaved = task(Some(30));
        unsaved.id = None;
        assert!(!registry.should_notify(&unsaved, at(9, 30, 0)));
    }

    #[test]
    fn mark_notified_is_idempotent() {
        let mut registry = ReminderRegistry::default();
        let t = task(Some(30));
        assert!(registry.mark_notified(&t));
        assert!(!registry.mark_notified(&t));
        assert_eq!(registry.len(), 1);
        assert!(!registry.should_notify(&t, at(9, 30, 0)));
    }

    #[test]
    fn changing_lead_time_arms_a_new_reminder() {
        let mut registry = ReminderRegistry::default();
        let t15 = task(Some(15));
        let t60 = task(Some(60));

        assert!(registry.should_notify(&t60, at(9, 0, 0)));
        registry.mark_notified(&t60);
        assert!(registry.should_notify(&t15, at(9, 45, 0)));
        registry.mark_notified(&t15);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reset_and_retain() {
        let mut registry = ReminderRegistry::default();
        let t = task(Some(30));
        registry.mark_notified(&t);

        registry.retain_tasks(&HashSet::from([10]));
        assert_eq!(registry.len(), 1);
        registry.retain_tasks(&HashSet::from([11]));
        assert!(registry.is_empty());

        registry.seed(ReminderKey::for_task(&t));
        assert!(!registry.should_notify(&t, at(9, 30, 0)));
        registry.reset();
        assert!(registry.should_notify(&t, at(9, 30, 0)));
    }

    #[test]
    fn window_from_config() {
        let config = ReminderConfig {
            window_early_secs: 0,
            window_late_secs: 90,
            ..Default::default()
        };
        let window = ReminderWindow::from_config(&config);
        assert_eq!(window.early, Duration::zero());
        assert_eq!(window.late, Duration::seconds(90));
    }
}
