pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod draft;
pub mod filter;
pub mod kanban;
pub mod logging;
pub mod models;
pub mod reminder;
pub mod stats;
pub mod tui;
pub mod utils;

pub use auth::Auth;
pub use config::Config;
pub use database::Database;
pub use models::{Category, Priority, Status, Subtask, Task, TaskPatch, User};
pub use utils::Profile;
