use chrono::{DateTime, Utc};
use std::time::Duration;

/// Fixed-interval tick schedule. It owns no thread; the host asks [`PollLoop::due`]
/// from its own loop and calls [`PollLoop::advance`] after each tick.
#[derive(Debug, Clone)]
pub struct PollLoop {
    interval: Duration,
    next_tick: Option<DateTime<Utc>>,
}

impl PollLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The first tick is due immediately.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.next_tick.is_none() {
            self.next_tick = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn due(&self, now: DateTime<Utc>) -> bool {
        self.next_tick.is_some_and(|next| now >= next)
    }

    /// Schedule the next tick one interval after `now`. No-op when stopped.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        if self.is_running() {
            let step = chrono::Duration::from_std(self.interval)
                .unwrap_or_else(|_| chrono::Duration::seconds(30));
            self.next_tick = Some(now + step);
        }
    }

    /// Time left until the next tick, None when stopped
    pub fn until_next(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_tick?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ticks_on_interval_after_start() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let mut poll = PollLoop::new(Duration::from_secs(30));
        assert!(!poll.due(t0));

        poll.start(t0);
        assert!(poll.due(t0));
        poll.advance(t0);
        assert!(!poll.due(t0 + chrono::Duration::seconds(29)));
        assert!(poll.due(t0 + chrono::Duration::seconds(30)));
        assert_eq!(poll.until_next(t0 + chrono::Duration::seconds(10)), Some(Duration::from_secs(20)));
    }

    #[test]
    fn stopped_loop_is_never_due() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let mut poll = PollLoop::new(Duration::from_secs(30));
        poll.start(t0);
        poll.stop();
        poll.advance(t0);
        assert!(!poll.is_running());
        assert!(!poll.due(t0 + chrono::Duration::hours(1)));
        assert_eq!(poll.until_next(t0), None);
    }

    #[test]
    fn restart_keeps_pending_schedule() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let mut poll = PollLoop::new(Duration::from_secs(30));
        poll.start(t0);
        poll.advance(t0);
        poll.start(t0 + chrono::Duration::seconds(5));
        assert!(!poll.due(t0 + chrono::Duration::seconds(5)));
    }
}
