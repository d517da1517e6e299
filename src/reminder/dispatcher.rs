//! Visible and audible alerts.
//!
//! The dispatcher holds no state of its own: permission lives in the platform, and
//! every call checks it afresh.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::io::Write;
use thiserror::Error;

use crate::models::Task;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Notification output failed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Notifications are not supported here")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    Reminder,
    Complete,
}

/// Where alerts end up
pub trait NotificationPlatform {
    fn is_supported(&self) -> bool;
    fn permission(&self) -> Permission;
    /// Ask the user. Only called when permission is not yet granted.
    fn request_permission(&mut self) -> Permission;
    fn show(&mut self, title: &str, body: &str) -> Result<(), DispatchError>;
    fn play(&mut self, sound: SoundKind) -> Result<(), DispatchError>;
}

pub struct Dispatcher<P> {
    platform: P,
    sound: bool,
}

impl<P: NotificationPlatform> Dispatcher<P> {
    pub fn new(platform: P, sound: bool) -> Self {
        Self { platform, sound }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Idempotent: never prompts once granted. False when unsupported or refused.
    pub fn request_permission(&mut self) -> bool {
        if !self.platform.is_supported() {
            tracing::info!("notifications not supported on this platform");
            return false;
        }
        match self.platform.permission() {
            Permission::Granted => true,
            Permission::Denied => false,
            Permission::Default => self.platform.request_permission() == Permission::Granted,
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.platform.is_supported() && self.platform.permission() == Permission::Granted
    }

    /// Show an alert. Returns false (and does nothing) without permission.
    pub fn notify(&mut self, title: &str, body: &str) -> Result<bool, DispatchError> {
        if !self.is_permitted() {
            tracing::debug!(title, "notification suppressed, permission not granted");
            return Ok(false);
        }
        self.platform.show(title, body)?;
        Ok(true)
    }

    /// Best effort; failures are logged and swallowed.
    pub fn play_sound(&mut self, kind: SoundKind) {
        if !self.sound {
            return;
        }
        if let Err(e) = self.platform.play(kind) {
            tracing::warn!(error = %e, ?kind, "failed to play sound");
        }
    }
}

/// Title and body of a due-date reminder
pub fn reminder_message(task: &Task) -> (String, String) {
    let minutes = task.remind_before_minutes.unwrap_or_default();
    (
        format!("Lembrete: {}", task.title),
        format!("A tarefa \"{}\" vence em {} minutos!", task.title, minutes),
    )
}

/// An alert waiting to be shown by the TUI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

/// In-app alerts: notices are queued for the UI to drain, sounds ring the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalPlatform {
    notices: VecDeque<Notice>,
}

impl TerminalPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.notices.len()
    }
}

impl NotificationPlatform for TerminalPlatform {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), DispatchError> {
        self.notices.push_back(Notice {
            title: title.to_string(),
            body: body.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }

    fn play(&mut self, _sound: SoundKind) -> Result<(), DispatchError> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

/// Line-oriented alerts for the headless watcher
pub struct ConsolePlatform<W: Write> {
    out: W,
}

impl<W: Write> ConsolePlatform<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> NotificationPlatform for ConsolePlatform<W> {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), DispatchError> {
        let stamp = chrono::Local::now().format("%H:%M");
        writeln!(self.out, "[{stamp}] {title}")?;
        writeln!(self.out, "        {body}")?;
        self.out.flush()?;
        Ok(())
    }

    fn play(&mut self, _sound: SoundKind) -> Result<(), DispatchError> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Platform double that records what it was asked to do.
#[cfg(test)]
#[derive(Debug)]
pub struct RecordingPlatform {
    pub supported: bool,
    pub permission: Permission,
    /// What the user answers when prompted
    pub answer: Permission,
    pub prompts: usize,
    pub shown: Vec<(String, String)>,
    pub sounds: Vec<SoundKind>,
    pub fail_sound: bool,
}

#[cfg(test)]
impl RecordingPlatform {
    pub fn granting() -> Self {
        Self {
            supported: true,
            permission: Permission::Default,
            answer: Permission::Granted,
            prompts: 0,
            shown: Vec::new(),
            sounds: Vec::new(),
            fail_sound: false,
        }
    }
}

#[cfg(test)]
impl NotificationPlatform for RecordingPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        self.prompts += 1;
        self.permission = self.answer;
        self.permission
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), DispatchError> {
        self.shown.push((title.to_string(), body.to_string()));
        Ok(())
    }

    fn play(&mut self, sound: SoundKind) -> Result<(), DispatchError> {
        if self.fail_sound {
            return Err(DispatchError::Unsupported);
        }
        self.sounds.push(sound);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_is_requested_once() {
        let mut dispatcher = Dispatcher::new(RecordingPlatform::granting(), true);
        assert!(dispatcher.request_permission());
        assert!(dispatcher.request_permission());
        assert_eq!(dispatcher.platform().prompts, 1);
    }

    #[test]
    fn unsupported_platform_never_prompts() {
        let mut platform = RecordingPlatform::granting();
        platform.supported = false;
        let mut dispatcher = Dispatcher::new(platform, true);
        assert!(!dispatcher.request_permission());
        assert_eq!(dispatcher.platform().prompts, 0);
        assert!(!dispatcher.notify("t", "b").unwrap());
    }

    #[test]
    fn notify_is_a_no_op_without_permission() {
        let mut platform = RecordingPlatform::granting();
        platform.answer = Permission::Denied;
        let mut dispatcher = Dispatcher::new(platform, true);
        assert!(!dispatcher.request_permission());
        assert!(!dispatcher.notify("t", "b").unwrap());
        assert!(dispatcher.platform().shown.is_empty());
        // refused permission is not asked again
        assert!(!dispatcher.request_permission());
        assert_eq!(dispatcher.platform().prompts, 1);
    }

    #[test]
    fn sound_failures_are_swallowed() {
        let mut platform = RecordingPlatform::granting();
        platform.fail_sound = true;
        let mut dispatcher = Dispatcher::new(platform, true);
        dispatcher.play_sound(SoundKind::Complete);
        assert!(dispatcher.platform().sounds.is_empty());
    }

    #[test]
    fn muted_dispatcher_plays_nothing() {
        let mut dispatcher = Dispatcher::new(RecordingPlatform::granting(), false);
        dispatcher.play_sound(SoundKind::Reminder);
        assert!(dispatcher.platform().sounds.is_empty());
    }

    #[test]
    fn reminder_text() {
        let mut task = Task::new(1, "Pagar contas".to_string());
        task.remind_before_minutes = Some(15);
        let (title, body) = reminder_message(&task);
        assert_eq!(title, "Lembrete: Pagar contas");
        assert_eq!(body, "A tarefa \"Pagar contas\" vence em 15 minutos!");
    }

    #[test]
    fn console_platform_writes_lines() {
        let mut dispatcher = Dispatcher::new(ConsolePlatform::new(Vec::new()), true);
        assert!(dispatcher.request_permission());
        dispatcher.notify("Lembrete: x", "body").unwrap();
        dispatcher.play_sound(SoundKind::Reminder);
        let out = String::from_utf8(dispatcher.platform_mut().out.clone()).unwrap();
        assert!(out.contains("Lembrete: x"));
        assert!(out.contains("body"));
        assert!(out.ends_with('\x07'));
    }

    #[test]
    fn terminal_platform_queues_notices() {
        let mut dispatcher = Dispatcher::new(TerminalPlatform::new(), false);
        dispatcher.notify("a", "b").unwrap();
        assert_eq!(dispatcher.platform().pending(), 1);
        let notices = dispatcher.platform_mut().drain();
        assert_eq!(notices[0].title, "a");
        assert_eq!(dispatcher.platform().pending(), 0);
    }
}
