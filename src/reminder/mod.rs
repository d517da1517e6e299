//! Due-date reminders.
//!
//! [`Scheduler`] ties the pieces together: the [`PollLoop`] decides when to look, the
//! [`ReminderRegistry`] decides whether a task's reminder is due and not yet delivered,
//! and the [`Dispatcher`] delivers it. The scheduler is owned by whichever view hosts
//! it and is driven from that view's loop; stopping or dropping it ends all ticks.

pub mod clock;
pub mod dispatcher;
pub mod poll;
pub mod registry;

pub use clock::{Clock, SystemClock};
pub use dispatcher::{
    ConsolePlatform, DispatchError, Dispatcher, Notice, NotificationPlatform, Permission,
    SoundKind, TerminalPlatform, reminder_message,
};
pub use poll::PollLoop;
pub use registry::{ReminderKey, ReminderRegistry, ReminderWindow};

use std::collections::HashSet;

use crate::config::ReminderConfig;
use crate::models::Task;

pub struct Scheduler<P, C = SystemClock> {
    registry: ReminderRegistry,
    poll: PollLoop,
    dispatcher: Dispatcher<P>,
    clock: C,
    tasks: Vec<Task>,
    enabled: bool,
    permission_requested: bool,
}

impl<P: NotificationPlatform, C: Clock> Scheduler<P, C> {
    pub fn new(config: &ReminderConfig, platform: P, clock: C) -> Self {
        Self {
            registry: ReminderRegistry::new(ReminderWindow::from_config(config)),
            poll: PollLoop::new(config.poll_interval()),
            dispatcher: Dispatcher::new(platform, config.sound),
            clock,
            tasks: Vec::new(),
            enabled: config.enabled,
            permission_requested: false,
        }
    }

    /// Start ticking. Notification permission is requested on the first start only.
    pub fn start(&mut self) {
        if !self.enabled {
            tracing::info!("reminders disabled in config");
            return;
        }
        if !self.permission_requested {
            let granted = self.dispatcher.request_permission();
            self.permission_requested = true;
            tracing::info!(granted, "notification permission");
        }
        self.poll.start(self.clock.now());
        tracing::debug!(interval = ?self.poll.interval(), "reminder poll loop started");
    }

    pub fn stop(&mut self) {
        if self.poll.is_running() {
            self.poll.stop();
            tracing::debug!("reminder poll loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.poll.is_running()
    }

    /// Replace the tasks under watch. Markers of tasks no longer present are dropped.
    pub fn set_tasks(&mut self, tasks: &[Task]) {
        self.tasks = tasks.to_vec();
        let ids: HashSet<i64> = self.tasks.iter().filter_map(|t| t.id).collect();
        self.registry.retain_tasks(&ids);
    }

    /// Restore reminders delivered in an earlier run
    pub fn seed(&mut self, keys: impl IntoIterator<Item = ReminderKey>) {
        self.registry.seed(keys);
    }

    /// Forget every delivered reminder
    pub fn reset(&mut self) {
        self.registry.reset();
    }

    /// Run a tick if one is due. Returns the reminders delivered by it.
    pub fn poll(&mut self) -> Vec<ReminderKey> {
        let now = self.clock.now();
        if !self.poll.due(now) {
            return Vec::new();
        }
        self.poll.advance(now);
        self.tick(now)
    }

    fn tick(&mut self, now: chrono::DateTime<chrono::Utc>) -> Vec<ReminderKey> {
        let mut fired = Vec::new();
        for task in &self.tasks {
            if !self.registry.should_notify(task, now) {
                continue;
            }
            let (title, body) = reminder_message(task);
            if let Err(e) = self.dispatcher.notify(&title, &body) {
                tracing::warn!(error = %e, task_id = ?task.id, "failed to show reminder");
            }
            self.dispatcher.play_sound(SoundKind::Reminder);
            self.registry.mark_notified(task);
            if let Some(key) = ReminderKey::for_task(task) {
                tracing::info!(task_id = key.task_id, lead = key.lead_minutes, "reminder fired");
                fired.push(key);
            }
        }
        fired
    }

    /// Completion chime
    pub fn task_completed(&mut self) {
        self.dispatcher.play_sound(SoundKind::Complete);
    }

    pub fn until_next(&self) -> Option<std::time::Duration> {
        self.poll.until_next(self.clock.now())
    }

    pub fn registry(&self) -> &ReminderRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<P> {
        &mut self.dispatcher
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<P, C> Drop for Scheduler<P, C> {
    fn drop(&mut self) {
        self.poll.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::clock::ManualClock;
    use crate::reminder::dispatcher::RecordingPlatform;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, s).unwrap()
    }

    fn task(id: i64, lead: u32) -> Task {
        let mut task = Task::new(1, format!("Task {id}"));
        task.id = Some(id);
        task.due_at = Some(at(10, 0, 0));
        task.remind_before_minutes = Some(lead);
        task
    }

    fn scheduler(config: ReminderConfig, start: DateTime<Utc>) -> Scheduler<RecordingPlatform, ManualClock> {
        Scheduler::new(&config, RecordingPlatform::granting(), ManualClock::new(start))
    }

    fn poll_at(s: &mut Scheduler<RecordingPlatform, ManualClock>, now: DateTime<Utc>) -> usize {
        s.clock().set(now);
        s.poll().len()
    }

    #[test]
    fn fires_once_on_the_tick_after_notify_at() {
        let config = ReminderConfig { window_early_secs: 0, ..Default::default() };
        let mut s = scheduler(config, at(9, 29, 40));
        s.set_tasks(&[task(1, 30)]);
        s.start();

        assert_eq!(poll_at(&mut s, at(9, 29, 40)), 0);
        assert_eq!(poll_at(&mut s, at(9, 30, 10)), 1);
        assert_eq!(poll_at(&mut s, at(9, 45, 0)), 0);

        let shown = &s.dispatcher().platform().shown;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, "Lembrete: Task 1");
        assert_eq!(s.dispatcher().platform().sounds, vec![SoundKind::Reminder]);
    }

    #[test]
    fn default_window_fires_on_the_first_tick_inside_it() {
        let mut s = scheduler(ReminderConfig::default(), at(9, 29, 40));
        s.set_tasks(&[task(1, 30)]);
        s.start();

        assert_eq!(poll_at(&mut s, at(9, 29, 40)), 1);
        assert_eq!(poll_at(&mut s, at(9, 30, 10)), 0);
        assert_eq!(s.dispatcher().platform().shown.len(), 1);
    }

    #[test]
    fn slow_poll_interval_still_lands_in_the_window() {
        let config = ReminderConfig { poll_interval_secs: 120, ..Default::default() };
        let start = at(9, 29, 20);
        let mut s = scheduler(config, start);
        s.set_tasks(&[task(1, 30)]);
        s.start();

        let fired: usize = (0..600)
            .map(|i| poll_at(&mut s, start + chrono::Duration::seconds(i)))
            .sum();
        assert_eq!(fired, 1);
    }

    #[test]
    fn completed_before_window_never_fires() {
        let mut s = scheduler(ReminderConfig::default(), at(9, 0, 0));
        let mut t = task(1, 30);
        s.set_tasks(std::slice::from_ref(&t));
        s.start();
        assert_eq!(poll_at(&mut s, at(9, 0, 0)), 0);

        t.set_completed(true);
        s.set_tasks(&[t]);
        assert_eq!(poll_at(&mut s, at(9, 30, 0)), 0);
        assert!(s.dispatcher().platform().shown.is_empty());
    }

    #[test]
    fn each_lead_time_fires_independently() {
        let mut s = scheduler(ReminderConfig::default(), at(8, 0, 0));
        s.set_tasks(&[task(1, 60), task(2, 15)]);
        s.start();

        assert_eq!(poll_at(&mut s, at(9, 0, 0)), 1);
        assert_eq!(poll_at(&mut s, at(9, 45, 0)), 1);
        assert_eq!(poll_at(&mut s, at(9, 45, 30)), 0);
        assert_eq!(s.registry().len(), 2);
    }

    #[test]
    fn stopped_scheduler_never_fires() {
        let mut s = scheduler(ReminderConfig::default(), at(9, 0, 0));
        s.set_tasks(&[task(1, 30)]);
        s.start();
        s.stop();

        assert_eq!(poll_at(&mut s, at(9, 30, 0)), 0);
        assert!(s.dispatcher().platform().shown.is_empty());
        assert_eq!(s.until_next(), None);
    }

    #[test]
    fn permission_is_requested_once_across_restarts() {
        let mut s = scheduler(ReminderConfig::default(), at(9, 0, 0));
        s.start();
        s.stop();
        s.start();
        assert_eq!(s.dispatcher().platform().prompts, 1);
    }

    #[test]
    fn denied_permission_still_marks_reminder() {
        let mut platform = RecordingPlatform::granting();
        platform.answer = Permission::Denied;
        let mut s = Scheduler::new(&ReminderConfig::default(), platform, ManualClock::new(at(9, 30, 0)));
        s.set_tasks(&[task(1, 30)]);
        s.start();

        assert_eq!(s.poll().len(), 1);
        assert!(s.dispatcher().platform().shown.is_empty());
        assert_eq!(s.registry().len(), 1);
    }

    #[test]
    fn seeded_reminders_do_not_fire_again() {
        let mut s = scheduler(ReminderConfig::default(), at(9, 30, 0));
        let t = task(1, 30);
        s.set_tasks(std::slice::from_ref(&t));
        s.seed(ReminderKey::for_task(&t));
        s.start();
        assert_eq!(s.poll().len(), 0);

        s.reset();
        s.clock().set(at(9, 30, 30));
        assert_eq!(s.poll().len(), 1);
    }

    #[test]
    fn disabled_scheduler_does_not_start() {
        let config = ReminderConfig { enabled: false, ..Default::default() };
        let mut s = scheduler(config, at(9, 30, 0));
        s.set_tasks(&[task(1, 30)]);
        s.start();
        assert!(!s.is_running());
        assert_eq!(s.poll().len(), 0);
        assert_eq!(s.dispatcher().platform().prompts, 0);
    }

    #[test]
    fn completion_plays_chime() {
        let mut s = scheduler(ReminderConfig::default(), at(9, 0, 0));
        s.task_completed();
        assert_eq!(s.dispatcher().platform().sounds, vec![SoundKind::Complete]);
    }
}
