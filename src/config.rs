use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width_percent: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_list_view_mode")]
    pub list_view_mode: String,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_toggle_sidebar")]
    pub toggle_sidebar: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_select")]
    pub select: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_tab_left")]
    pub tab_left: String,
    #[serde(default = "default_tab_right")]
    pub tab_right: String,
    #[serde(default = "default_tab_1")]
    pub tab_1: String,
    #[serde(default = "default_tab_2")]
    pub tab_2: String,
    #[serde(default = "default_tab_3")]
    pub tab_3: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_toggle_task_status")]
    pub toggle_task_status: String,
    #[serde(default = "default_toggle_list_view")]
    pub toggle_list_view: String,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_move_left")]
    pub move_left: String,
    #[serde(default = "default_move_right")]
    pub move_right: String,
    #[serde(default = "default_add_subtask")]
    pub add_subtask: String,
    #[serde(default = "default_cycle_theme")]
    pub cycle_theme: String,
    #[serde(default = "default_copy")]
    pub copy: String,
    #[serde(default = "default_sign_out")]
    pub sign_out: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
}

/// `[reminders]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// How long before `notify_at` a tick may already fire
    #[serde(default = "default_window_early")]
    pub window_early_secs: u64,
    /// How long after `notify_at` a tick may still fire
    #[serde(default = "default_window_late")]
    pub window_late_secs: u64,
    #[serde(default = "default_true")]
    pub sound: bool,
    /// Remember delivered reminders across restarts
    #[serde(default = "default_true")]
    pub persist_notified: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut themes = HashMap::new();

        // Add example custom theme for users to see how to define themes
        themes.insert("lightblue".to_string(), Theme {
            fg: "cyan".to_string(),
            bg: "black".to_string(),
            highlight_bg: "blue".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "gray".to_string(),
        });

        Self {
            sidebar_width_percent: default_sidebar_width(),
            database_path: default_database_path(),
            log_level: default_log_level(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes,
            list_view_mode: default_list_view_mode(),
            reminders: ReminderConfig::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            toggle_sidebar: default_toggle_sidebar(),
            new: default_new(),
            edit: default_edit(),
            save: default_save(),
            delete: default_delete(),
            select: default_select(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            tab_left: default_tab_left(),
            tab_right: default_tab_right(),
            tab_1: default_tab_1(),
            tab_2: default_tab_2(),
            tab_3: default_tab_3(),
            help: default_help(),
            toggle_task_status: default_toggle_task_status(),
            toggle_list_view: default_toggle_list_view(),
            filter: default_filter(),
            move_left: default_move_left(),
            move_right: default_move_right(),
            add_subtask: default_add_subtask(),
            cycle_theme: default_cycle_theme(),
            copy: default_copy(),
            sign_out: default_sign_out(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
            window_early_secs: default_window_early(),
            window_late_secs: default_window_late(),
            sound: true,
            persist_notified: true,
        }
    }
}

impl ReminderConfig {
    /// Poll interval, clamped to 1..=300 seconds and to the reminder window width,
    /// so every window contains at least one tick
    pub fn poll_interval(&self) -> Duration {
        let requested = self.poll_interval_secs.clamp(1, 300);
        let window = (self.window_early_secs.min(86_400) + self.window_late_secs.min(86_400)).max(1);
        if requested > window {
            tracing::warn!(
                requested,
                window,
                "poll interval wider than the reminder window, using the window width"
            );
        }
        Duration::from_secs(requested.min(window))
    }
}

impl Theme {
    /// Get preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();

        themes.insert("default".to_string(), Theme {
            fg: "white".to_string(),
            bg: "black".to_string(),
            highlight_bg: "blue".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "gray".to_string(),
        });

        themes.insert("dark".to_string(), Theme {
            fg: "white".to_string(),
            bg: "black".to_string(),
            highlight_bg: "cyan".to_string(),
            highlight_fg: "black".to_string(),
            tab_bg: "gray".to_string(),
        });

        themes.insert("light".to_string(), Theme {
            fg: "black".to_string(),
            bg: "white".to_string(),
            highlight_bg: "blue".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "gray".to_string(),
        });

        themes
    }
}

// Default value functions
fn default_sidebar_width() -> u16 {
    40
}

fn default_database_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("tasks.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/taskboard/tasks.db".to_string()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_toggle_sidebar() -> String {
    "b".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_select() -> String {
    "Enter".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_tab_left() -> String {
    "Left".to_string()
}

fn default_tab_right() -> String {
    "Right".to_string()
}

fn default_tab_1() -> String {
    "1".to_string()
}

fn default_tab_2() -> String {
    "2".to_string()
}

fn default_tab_3() -> String {
    "3".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_toggle_task_status() -> String {
    "Space".to_string()
}

fn default_toggle_list_view() -> String {
    "t".to_string()
}

fn default_filter() -> String {
    "f".to_string()
}

fn default_move_left() -> String {
    "<".to_string()
}

fn default_move_right() -> String {
    ">".to_string()
}

fn default_add_subtask() -> String {
    "a".to_string()
}

fn default_cycle_theme() -> String {
    "F2".to_string()
}

fn default_copy() -> String {
    "y".to_string()
}

fn default_sign_out() -> String {
    "Ctrl+o".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_list_view_mode() -> String {
    "Simple".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_window_early() -> u64 {
    30
}

fn default_window_late() -> u64 {
    60
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),
}

impl Config {
    /// Load configuration from an explicit path, creating it with defaults if missing.
    /// An empty `database_path` falls back to the profile's data directory.
    pub fn load_from(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;

            if config.database_path.trim().is_empty() {
                config.database_path = Self::default_database_path_for_profile(profile);
            }

            Ok(config)
        } else {
            // Create default config and save it
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            config.save_to(config_path)?;
            tracing::info!(path = %config_path.display(), "created default config");
            Ok(config)
        }
    }

    pub fn save_to(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("tasks.db").to_string_lossy().to_string()
        } else {
            format!("~/.local/share/{}/tasks.db", profile.app_name())
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Get the currently active theme
    /// If highlight_fg is not set (empty string), it will be calculated from highlight_bg
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{format_color_for_display, get_contrast_text_color, parse_color};

        let mut theme = if let Some(theme) = self.themes.get(&self.current_theme) {
            theme.clone()
        } else if let Some(theme) = Theme::get_preset_themes().get(&self.current_theme) {
            theme.clone()
        } else {
            Theme::default()
        };

        if theme.highlight_fg.is_empty() {
            let highlight_bg_color = parse_color(&theme.highlight_bg);
            let calculated_fg = get_contrast_text_color(highlight_bg_color);
            theme.highlight_fg = format_color_for_display(&calculated_fg);
        }

        theme
    }

    /// Set the active theme by name
    pub fn set_theme(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.themes.contains_key(name) && !Theme::get_preset_themes().contains_key(name) {
            return Err(ConfigError::ThemeNotFound(name.to_string()));
        }

        self.current_theme = name.to_string();
        Ok(())
    }

    /// Get all available theme names (presets + user-defined), sorted
    pub fn get_available_themes(&self) -> Vec<String> {
        let presets = Theme::get_preset_themes();
        let mut themes: Vec<String> = presets.keys().cloned().collect();

        for theme_name in self.themes.keys() {
            if !presets.contains_key(theme_name) {
                themes.push(theme_name.clone());
            }
        }

        themes.sort();
        themes
    }

    /// Switch to the next available theme and return its name
    pub fn cycle_theme(&mut self) -> String {
        let themes = self.get_available_themes();
        let next = themes
            .iter()
            .position(|t| *t == self.current_theme)
            .map(|i| (i + 1) % themes.len())
            .unwrap_or(0);
        if let Some(name) = themes.get(next) {
            self.current_theme = name.clone();
        }
        self.current_theme.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let config = Config::load_from(&path, utils::Profile::Dev).unwrap();
        assert!(path.exists());
        assert_eq!(config.reminders, ReminderConfig::default());
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
        assert!(config.database_path.ends_with("tasks.db"));
    }

    #[test]
    fn round_trips_edited_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.database_path = "/tmp/elsewhere.db".to_string();
        config.reminders.poll_interval_secs = 5;
        config.reminders.persist_notified = false;
        config.key_bindings.quit = "Ctrl+q".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path, utils::Profile::Dev).unwrap();
        assert_eq!(loaded.database_path, "/tmp/elsewhere.db");
        assert_eq!(loaded.reminders.poll_interval_secs, 5);
        assert!(!loaded.reminders.persist_notified);
        assert_eq!(loaded.key_bindings.quit, "Ctrl+q");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = \"debug\"\n[reminders]\nsound = false\n").unwrap();

        let loaded = Config::load_from(&path, utils::Profile::Dev).unwrap();
        assert_eq!(loaded.log_level, "debug");
        assert!(!loaded.reminders.sound);
        assert!(loaded.reminders.enabled);
        assert_eq!(loaded.reminders.window_late_secs, 60);
        assert_eq!(loaded.key_bindings.new, "n");
        assert!(!loaded.database_path.is_empty());
    }

    #[test]
    fn poll_interval_is_clamped() {
        let mut reminders = ReminderConfig::default();
        reminders.poll_interval_secs = 0;
        assert_eq!(reminders.poll_interval(), Duration::from_secs(1));
        reminders.poll_interval_secs = 3600;
        reminders.window_late_secs = 600;
        assert_eq!(reminders.poll_interval(), Duration::from_secs(300));
    }

    #[test]
    fn poll_interval_never_exceeds_the_window() {
        let mut reminders = ReminderConfig::default();
        reminders.poll_interval_secs = 120;
        assert_eq!(reminders.poll_interval(), Duration::from_secs(90));
        reminders.poll_interval_secs = 60;
        assert_eq!(reminders.poll_interval(), Duration::from_secs(60));
        reminders.window_early_secs = 0;
        reminders.window_late_secs = 0;
        assert_eq!(reminders.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn themes_cycle_and_validate() {
        let mut config = Config::default();
        assert!(config.set_theme("nope").is_err());
        config.set_theme("dark").unwrap();
        assert_eq!(config.cycle_theme(), "default");
        assert_eq!(config.cycle_theme(), "light");
        assert_eq!(config.cycle_theme(), "lightblue");
        assert_eq!(config.cycle_theme(), "dark");
    }
}
