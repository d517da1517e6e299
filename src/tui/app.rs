use crate::auth::{Auth, AuthEvent};
use crate::database::DatabaseError;
use crate::draft::TaskDraft;
use crate::filter::{self, CategoryFilter, PriorityFilter, StatusFilter, TaskFilter};
use crate::kanban::{self, Board, Direction};
use crate::models::{Category, Priority, Status, Subtask, Task, TaskPatch, User};
use crate::reminder::{Notice, Scheduler, SystemClock, TerminalPlatform};
use crate::stats::Statistics;
use crate::tui::error::TuiError;
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::item_view::get_content_string;
use crate::{Config, Database};
use chrono::{Local, Utc};
use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Tasks,
    Board,
    Statistics,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Tasks, Tab::Board, Tab::Statistics];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Tasks => "Tasks",
            Tab::Board => "Board",
            Tab::Statistics => "Statistics",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Tasks => 0,
            Tab::Board => 1,
            Tab::Statistics => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarState {
    Expanded,
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListViewMode {
    Simple,
    TwoLine,
}

impl ListViewMode {
    pub fn from_config(value: &str) -> Self {
        match value {
            "TwoLine" => ListViewMode::TwoLine,
            _ => ListViewMode::Simple,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListViewMode::Simple => "Simple",
            ListViewMode::TwoLine => "TwoLine",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Login,
    View,
    Create,
    Filter,
    Help,
    SubtaskInput,
}

/// Which part of the Tasks tab receives list navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Subtasks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    SignIn,
    SignUp,
    Reset,
}

impl LoginAction {
    pub const ALL: [LoginAction; 3] = [LoginAction::SignIn, LoginAction::SignUp, LoginAction::Reset];

    pub fn label(&self) -> &'static str {
        match self {
            LoginAction::SignIn => "Sign in",
            LoginAction::SignUp => "Create account",
            LoginAction::Reset => "Reset password",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
    Action,
}

#[derive(Debug, Clone)]
pub struct LoginState {
    pub current_field: LoginField,
    pub email: Editor,
    pub password: Editor,
    pub action: LoginAction,
    pub error: Option<String>,
    pub info: Option<String>,
}

impl Default for LoginState {
    fn default() -> Self {
        Self {
            current_field: LoginField::Email,
            email: Editor::new(),
            password: Editor::new(),
            action: LoginAction::SignIn,
            error: None,
            info: None,
        }
    }
}

impl LoginState {
    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Action,
            LoginField::Action => LoginField::Email,
        };
    }

    pub fn prev_field(&mut self) {
        self.current_field = match self.current_field {
            LoginField::Email => LoginField::Action,
            LoginField::Password => LoginField::Email,
            LoginField::Action => LoginField::Password,
        };
    }

    pub fn cycle_action(&mut self, forward: bool) {
        self.action = filter::cycle(&LoginAction::ALL, self.action, forward);
    }

    pub fn current_editor_mut(&mut self) -> Option<&mut Editor> {
        match self.current_field {
            LoginField::Email => Some(&mut self.email),
            LoginField::Password => Some(&mut self.password),
            LoginField::Action => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Description,
    Category,
    Priority,
    DueDate,
    DueTime,
    Remind,
}

impl TaskField {
    pub const ALL: [TaskField; 7] = [
        TaskField::Title,
        TaskField::Description,
        TaskField::Category,
        TaskField::Priority,
        TaskField::DueDate,
        TaskField::DueTime,
        TaskField::Remind,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskField::Title => "Title",
            TaskField::Description => "Description",
            TaskField::Category => "Category",
            TaskField::Priority => "Priority",
            TaskField::DueDate => "Due date (YYYY-MM-DD)",
            TaskField::DueTime => "Due time (HH:MM, empty = end of day)",
            TaskField::Remind => "Remind minutes before (empty = none)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    pub current_field: TaskField,
    pub title: Editor,
    pub description: Editor,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Editor,
    pub due_time: Editor,
    pub remind: Editor,
    pub editing_item_id: Option<i64>, // None for new items, Some(id) for editing
    pub error: Option<String>,
}

impl TaskForm {
    /// Empty form, due today
    pub fn new() -> Self {
        let defaults = Task::new(0, String::new());
        Self {
            current_field: TaskField::Title,
            title: Editor::new(),
            description: Editor::new(),
            category: defaults.category,
            priority: defaults.priority,
            due_date: Editor::from_string(&Local::now().format("%Y-%m-%d").to_string()),
            due_time: Editor::new(),
            remind: Editor::new(),
            editing_item_id: None,
            error: None,
        }
    }

    pub fn from_task(task: &Task) -> Self {
        let draft = TaskDraft::from_task(task);
        Self {
            current_field: TaskField::Title,
            title: Editor::from_string(&draft.title),
            description: Editor::from_string(&draft.description),
            category: task.category,
            priority: task.priority,
            due_date: Editor::from_string(&draft.due_date),
            due_time: Editor::from_string(&draft.due_time),
            remind: Editor::from_string(&draft.remind_minutes),
            editing_item_id: task.id,
            error: None,
        }
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.text(),
            description: self.description.text(),
            category: self.category.as_str().to_string(),
            priority: self.priority.as_str().to_string(),
            due_date: self.due_date.text(),
            due_time: self.due_time.text(),
            remind_minutes: self.remind.text(),
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = filter::cycle(&TaskField::ALL, self.current_field, true);
    }

    pub fn prev_field(&mut self) {
        self.current_field = filter::cycle(&TaskField::ALL, self.current_field, false);
    }

    pub fn is_multi_line(&self) -> bool {
        self.current_field == TaskField::Description
    }

    /// Left/Right on a selector field
    pub fn cycle_choice(&mut self, forward: bool) -> bool {
        match self.current_field {
            TaskField::Category => self.category = filter::cycle(&Category::ALL, self.category, forward),
            TaskField::Priority => self.priority = filter::cycle(&Priority::ALL, self.priority, forward),
            _ => return false,
        }
        true
    }

    pub fn current_editor_mut(&mut self) -> Option<&mut Editor> {
        match self.current_field {
            TaskField::Title => Some(&mut self.title),
            TaskField::Description => Some(&mut self.description),
            TaskField::DueDate => Some(&mut self.due_date),
            TaskField::DueTime => Some(&mut self.due_time),
            TaskField::Remind => Some(&mut self.remind),
            TaskField::Category | TaskField::Priority => None,
        }
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFormField {
    Category,
    Priority,
    Status,
    Apply,
    Clear,
    Cancel,
}

impl FilterFormField {
    pub const ALL: [FilterFormField; 6] = [
        FilterFormField::Category,
        FilterFormField::Priority,
        FilterFormField::Status,
        FilterFormField::Apply,
        FilterFormField::Clear,
        FilterFormField::Cancel,
    ];
}

#[derive(Debug, Clone)]
pub struct FilterFormState {
    pub current_field: FilterFormField,
    pub category: CategoryFilter,
    pub priority: PriorityFilter,
    pub status: StatusFilter,
}

impl FilterFormState {
    pub fn from_filter(filter: &TaskFilter) -> Self {
        Self {
            current_field: FilterFormField::Category,
            category: filter.category,
            priority: filter.priority,
            status: filter.status,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = filter::cycle(&FilterFormField::ALL, self.current_field, true);
    }

    pub fn prev_field(&mut self) {
        self.current_field = filter::cycle(&FilterFormField::ALL, self.current_field, false);
    }

    pub fn cycle_value(&mut self, forward: bool) {
        match self.current_field {
            FilterFormField::Category => {
                self.category = filter::cycle(&CategoryFilter::options(), self.category, forward)
            }
            FilterFormField::Priority => {
                self.priority = filter::cycle(&PriorityFilter::options(), self.priority, forward)
            }
            FilterFormField::Status => {
                self.status = filter::cycle(&StatusFilter::options(), self.status, forward)
            }
            _ => {}
        }
    }

    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            category: self.category,
            priority: self.priority,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_tab: Tab,
    pub sidebar_state: SidebarState,
    pub mode: Mode,
    pub focus: Focus,
    pub selected_index: usize,
    pub list_state: ListState,
    pub subtask_index: usize,
    pub item_view_scroll: usize,
    pub list_view_mode: ListViewMode,
    pub board_column: usize,
    pub board_row: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_tab: Tab::Tasks,
            sidebar_state: SidebarState::Expanded,
            mode: Mode::Login,
            focus: Focus::List,
            selected_index: 0,
            list_state: ListState::default(),
            subtask_index: 0,
            item_view_scroll: 0,
            list_view_mode: ListViewMode::Simple,
            board_column: 0,
            board_row: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<Task>,
    pub delete_modal_selection: usize, // 0 = Delete, 1 = Cancel
    pub subtask_input: Editor,
    /// Delivered reminders waiting to be acknowledged, oldest first
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub task_form: Option<TaskForm>,
    pub login: LoginState,
    pub filter_form: Option<FilterFormState>,
}

pub struct App {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub database: Database,
    pub auth: Auth,
    auth_events: Receiver<AuthEvent>,
    pub user: Option<User>,

    pub tasks: Vec<Task>,
    pub filter: TaskFilter,
    pub scheduler: Scheduler<TerminalPlatform>,

    pub ui: UiState,
    pub modals: ModalState,
    pub status: StatusState,
    pub form: FormState,
}

impl App {
    pub fn new(config: Config, database: Database) -> Result<Self, TuiError> {
        let mut auth = Auth::new();
        let auth_events = auth.subscribe();
        let scheduler = Scheduler::new(&config.reminders, TerminalPlatform::new(), SystemClock);
        let list_view_mode = ListViewMode::from_config(&config.list_view_mode);

        let mut app = Self {
            config,
            config_path: None,
            database,
            auth,
            auth_events,
            user: None,
            tasks: Vec::new(),
            filter: TaskFilter::default(),
            scheduler,
            ui: UiState {
                list_view_mode,
                ..UiState::default()
            },
            modals: ModalState::default(),
            status: StatusState::default(),
            form: FormState::default(),
        };

        // Resume the stored session, if any
        if let Some(user) = app.auth.current_user(&app.database)? {
            app.on_signed_in(user)?;
        }
        Ok(app)
    }

    /// Where config changes (theme, list view) are written back
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn user_id(&self) -> Result<i64, TuiError> {
        self.user.as_ref().map(|u| u.id).ok_or(TuiError::NotSignedIn)
    }

    // ---- session ----

    /// Apply every pending session change
    pub fn handle_auth_events(&mut self) -> Result<(), TuiError> {
        while let Ok(event) = self.auth_events.try_recv() {
            match event {
                AuthEvent::SignedIn(user) => self.on_signed_in(user)?,
                AuthEvent::SignedOut => self.on_signed_out(),
                AuthEvent::UserUpdated(user) => self.user = Some(user),
                AuthEvent::PasswordRecovery(user) => {
                    tracing::info!(user_id = user.id, "password recovery issued");
                }
            }
        }
        Ok(())
    }

    fn on_signed_in(&mut self, user: User) -> Result<(), TuiError> {
        tracing::info!(user_id = user.id, "session started");
        let label = user.display_label().to_string();
        let user_id = user.id;
        self.user = Some(user);
        self.form.login = LoginState::default();
        self.ui.mode = Mode::View;
        self.ui.selected_index = 0;
        self.load_data()?;

        self.scheduler.reset();
        if self.config.reminders.persist_notified {
            self.scheduler.seed(self.database.load_reminder_log(user_id)?);
        }
        self.scheduler.start();
        self.set_status_message(format!("Signed in as {}", label));
        Ok(())
    }

    fn on_signed_out(&mut self) {
        tracing::info!("session ended");
        self.scheduler.stop();
        self.scheduler.reset();
        self.scheduler.set_tasks(&[]);
        self.user = None;
        self.tasks.clear();
        self.filter = TaskFilter::default();
        self.modals = ModalState::default();
        self.form = FormState::default();
        self.ui.mode = Mode::Login;
        self.ui.focus = Focus::List;
        self.ui.selected_index = 0;
        self.sync_list_state();
    }

    pub fn submit_login(&mut self) -> Result<(), TuiError> {
        let email = self.form.login.email.text();
        let password = self.form.login.password.text();
        self.form.login.error = None;
        self.form.login.info = None;

        let result = match self.form.login.action {
            LoginAction::SignIn => self.auth.sign_in(&self.database, &email, &password).map(|_| ()),
            LoginAction::SignUp => self.auth.sign_up(&self.database, &email, &password).map(|_| ()),
            LoginAction::Reset => self.auth.reset_password(&self.database, &email).map(|token| {
                self.form.login.info = Some(match token {
                    Some(token) => format!("Reset token: {} (use `taskboard reset-password --token`)", token),
                    None => format!("If an account exists for {}, a reset token has been issued", email.trim()),
                });
            }),
        };
        match result {
            Ok(()) => self.handle_auth_events(),
            // Database failures are real errors, the rest belong on the form
            Err(crate::auth::AuthError::DatabaseError(e)) => Err(e.into()),
            Err(e) => {
                self.form.login.error = Some(e.to_string());
                self.form.login.password.clear();
                Ok(())
            }
        }
    }

    pub fn sign_out(&mut self) -> Result<(), TuiError> {
        self.auth.sign_out(&self.database)?;
        self.handle_auth_events()?;
        self.set_status_message("Signed out".to_string());
        Ok(())
    }

    // ---- data ----

    pub fn load_data(&mut self) -> Result<(), DatabaseError> {
        let Some(user_id) = self.user.as_ref().map(|u| u.id) else {
            self.tasks.clear();
            return Ok(());
        };
        self.tasks = self.database.list_tasks_by_owner(user_id)?;
        self.scheduler.set_tasks(&self.tasks);
        self.adjust_selected_index();
        Ok(())
    }

    /// Tasks that pass the active filter, in list order
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.filter.apply(&self.tasks)
    }

    pub fn board(&self) -> Board<'_> {
        Board::from_tasks(self.visible_tasks())
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::compute(&self.tasks, Utc::now())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        match self.ui.current_tab {
            Tab::Tasks => self.visible_tasks().get(self.ui.selected_index).copied(),
            Tab::Board => {
                let status = Status::ALL.get(self.ui.board_column)?;
                self.board().column(*status).get(self.ui.board_row).copied()
            }
            Tab::Statistics => None,
        }
    }

    pub fn selected_subtask(&self) -> Option<&Subtask> {
        self.selected_task()?.subtasks.get(self.ui.subtask_index)
    }

    fn selected_task_id(&self) -> Option<i64> {
        self.selected_task().and_then(|t| t.id)
    }

    pub fn adjust_selected_index(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            self.ui.selected_index = 0;
        } else if self.ui.selected_index >= len {
            self.ui.selected_index = len - 1;
        }

        let column_len = self.board_column_len();
        if self.ui.board_row >= column_len {
            self.ui.board_row = column_len.saturating_sub(1);
        }

        let subtasks = self.selected_task().map(|t| t.subtasks.len()).unwrap_or(0);
        if self.ui.subtask_index >= subtasks {
            self.ui.subtask_index = subtasks.saturating_sub(1);
        }
        if subtasks == 0 && self.ui.focus == Focus::Subtasks {
            self.ui.focus = Focus::List;
        }
        self.sync_list_state();
    }

    pub fn sync_list_state(&mut self) {
        if self.visible_tasks().is_empty() {
            self.ui.list_state.select(None);
        } else {
            self.ui.list_state.select(Some(self.ui.selected_index));
        }
    }

    fn board_column_len(&self) -> usize {
        Status::ALL
            .get(self.ui.board_column)
            .map(|s| self.board().column(*s).len())
            .unwrap_or(0)
    }

    // ---- navigation ----

    pub fn switch_tab(&mut self, tab: Tab) {
        self.ui.current_tab = tab;
        self.ui.focus = Focus::List;
        self.ui.item_view_scroll = 0;
        self.adjust_selected_index();
    }

    pub fn next_tab(&mut self) {
        let next = Tab::ALL.get(self.ui.current_tab.index() + 1).copied();
        if let Some(tab) = next {
            self.switch_tab(tab);
        }
    }

    pub fn prev_tab(&mut self) {
        if let Some(index) = self.ui.current_tab.index().checked_sub(1) {
            self.switch_tab(Tab::ALL[index]);
        }
    }

    pub fn toggle_sidebar(&mut self) {
        self.ui.sidebar_state = match self.ui.sidebar_state {
            SidebarState::Expanded => SidebarState::Collapsed,
            SidebarState::Collapsed => SidebarState::Expanded,
        };
    }

    pub fn toggle_list_view(&mut self) {
        self.ui.list_view_mode = match self.ui.list_view_mode {
            ListViewMode::Simple => ListViewMode::TwoLine,
            ListViewMode::TwoLine => ListViewMode::Simple,
        };
        self.config.list_view_mode = self.ui.list_view_mode.as_str().to_string();
        self.save_config();
    }

    /// Tab key: list and subtasks on the Tasks tab, next column on the Board
    pub fn cycle_focus(&mut self) {
        match self.ui.current_tab {
            Tab::Tasks => {
                let has_subtasks = self.selected_task().is_some_and(|t| !t.subtasks.is_empty());
                self.ui.focus = match self.ui.focus {
                    Focus::List if has_subtasks => Focus::Subtasks,
                    _ => Focus::List,
                };
            }
            Tab::Board => {
                self.ui.board_column = (self.ui.board_column + 1) % Status::ALL.len();
                self.ui.board_row = 0;
            }
            Tab::Statistics => {}
        }
    }

    pub fn move_selection_up(&mut self) {
        match (self.ui.current_tab, self.ui.focus) {
            (Tab::Tasks, Focus::Subtasks) => {
                self.ui.subtask_index = self.ui.subtask_index.saturating_sub(1);
            }
            (Tab::Tasks, Focus::List) => {
                if self.ui.selected_index > 0 {
                    self.ui.selected_index -= 1;
                    self.ui.subtask_index = 0;
                    self.ui.item_view_scroll = 0;
                }
                self.sync_list_state();
            }
            (Tab::Board, _) => {
                self.ui.board_row = self.ui.board_row.saturating_sub(1);
            }
            (Tab::Statistics, _) => {}
        }
    }

    pub fn move_selection_down(&mut self) {
        match (self.ui.current_tab, self.ui.focus) {
            (Tab::Tasks, Focus::Subtasks) => {
                let len = self.selected_task().map(|t| t.subtasks.len()).unwrap_or(0);
                if self.ui.subtask_index + 1 < len {
                    self.ui.subtask_index += 1;
                }
            }
            (Tab::Tasks, Focus::List) => {
                if self.ui.selected_index + 1 < self.visible_tasks().len() {
                    self.ui.selected_index += 1;
                    self.ui.subtask_index = 0;
                    self.ui.item_view_scroll = 0;
                }
                self.sync_list_state();
            }
            (Tab::Board, _) => {
                if self.ui.board_row + 1 < self.board_column_len() {
                    self.ui.board_row += 1;
                }
            }
            (Tab::Statistics, _) => {}
        }
    }

    // ---- status bar ----

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn check_status_message_timeout(&mut self) {
        if let Some(time) = self.status.message_time {
            if time.elapsed() >= STATUS_MESSAGE_TIMEOUT {
                self.status.message = None;
                self.status.message_time = None;
            }
        }
    }

    // ---- config ----

    pub fn cycle_theme(&mut self) {
        let name = self.config.cycle_theme();
        self.save_config();
        self.set_status_message(format!("Theme: {}", name));
    }

    fn save_config(&mut self) {
        if let Some(path) = self.config_path.clone() {
            if let Err(e) = self.config.save_to(&path) {
                tracing::warn!(error = %e, "failed to save config");
            }
        }
    }

    // ---- task form ----

    pub fn enter_create_mode(&mut self) {
        self.form.task_form = Some(TaskForm::new());
        self.ui.mode = Mode::Create;
    }

    pub fn enter_edit_mode(&mut self) {
        if let Some(task) = self.selected_task() {
            self.form.task_form = Some(TaskForm::from_task(task));
            self.ui.mode = Mode::Create;
        }
    }

    pub fn cancel_form(&mut self) {
        self.form.task_form = None;
        self.ui.mode = Mode::View;
    }

    /// Validate and persist the open form. Validation failures stay on the form.
    pub fn save_form(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id()?;
        let Some(form) = self.form.task_form.as_mut() else {
            return Ok(());
        };
        let validated = match form.draft().validate() {
            Ok(v) => v,
            Err(e) => {
                form.error = Some(e.to_string());
                return Ok(());
            }
        };

        let editing = form.editing_item_id;
        let saved_id = match editing {
            Some(id) => {
                self.database.update_task(id, user_id, &validated.into_patch())?;
                id
            }
            None => self.database.create_task(&validated.into_task(user_id))?,
        };
        tracing::debug!(task_id = saved_id, edited = editing.is_some(), "task saved");

        self.form.task_form = None;
        self.ui.mode = Mode::View;
        self.load_data()?;
        self.select_task_id(saved_id);
        self.set_status_message(if editing.is_some() { "Task updated" } else { "Task created" }.to_string());
        Ok(())
    }

    /// Point the list (and board) selection at a task if it is visible
    fn select_task_id(&mut self, id: i64) {
        if let Some(index) = self.visible_tasks().iter().position(|t| t.id == Some(id)) {
            self.ui.selected_index = index;
        }
        let board = self.board();
        let found = board
            .columns()
            .enumerate()
            .find_map(|(col, (_, tasks))| tasks.iter().position(|t| t.id == Some(id)).map(|row| (col, row)));
        if let Some((col, row)) = found {
            self.ui.board_column = col;
            self.ui.board_row = row;
        }
        self.adjust_selected_index();
    }

    // ---- task actions ----

    pub fn toggle_selected_task(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id()?;
        let Some(task) = self.selected_task() else {
            return Ok(());
        };
        let Some(id) = task.id else {
            return Ok(());
        };
        let patch = TaskPatch {
            completed: Some(!task.completed),
            ..Default::default()
        };
        let updated = self.database.update_task(id, user_id, &patch)?;
        if updated.completed {
            self.scheduler.task_completed();
        }
        self.load_data()?;
        self.select_task_id(id);
        self.set_status_message(format!(
            "\"{}\" marked {}",
            updated.title,
            if updated.completed { "done" } else { "not done" }
        ));
        Ok(())
    }

    /// Shift the selected task one board column
    pub fn move_selected_task(&mut self, direction: Direction) -> Result<(), TuiError> {
        let user_id = self.user_id()?;
        let Some(mut task) = self.selected_task().cloned() else {
            return Ok(());
        };
        let Some(id) = task.id else {
            return Ok(());
        };
        let Some(patch) = kanban::move_task(&mut task, direction) else {
            return Ok(());
        };
        self.database.update_task(id, user_id, &patch)?;
        if task.completed {
            self.scheduler.task_completed();
        }
        self.load_data()?;
        self.select_task_id(id);
        self.set_status_message(format!("Moved to {}", task.status.label()));
        Ok(())
    }

    pub fn request_delete(&mut self) {
        if let Some(task) = self.selected_task().cloned() {
            self.modals.delete_confirmation = Some(task);
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.modals.delete_confirmation = None;
    }

    pub fn confirm_delete(&mut self) -> Result<(), TuiError> {
        let Some(task) = self.modals.delete_confirmation.take() else {
            return Ok(());
        };
        let user_id = self.user_id()?;
        if let Some(id) = task.id {
            self.database.delete_task(id, user_id)?;
            self.load_data()?;
            self.set_status_message("Task deleted".to_string());
        }
        Ok(())
    }

    pub fn copy_selected_task(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let content = get_content_string(task);
        match arboard::Clipboard::new() {
            Ok(mut clipboard) => match clipboard.set_text(content) {
                Ok(()) => self.set_status_message("Copied to clipboard".to_string()),
                Err(e) => self.set_status_message(format!("Failed to copy to clipboard: {}", e)),
            },
            Err(_) => self.set_status_message("Failed to access clipboard".to_string()),
        }
    }

    // ---- subtasks ----

    pub fn enter_subtask_input(&mut self) {
        if self.selected_task().is_some() {
            self.modals.subtask_input.clear();
            self.ui.mode = Mode::SubtaskInput;
        }
    }

    pub fn cancel_subtask_input(&mut self) {
        self.modals.subtask_input.clear();
        self.ui.mode = Mode::View;
    }

    pub fn submit_subtask(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id()?;
        let title = self.modals.subtask_input.text().trim().to_string();
        if title.is_empty() {
            self.set_status_message("Subtask title is required".to_string());
            return Ok(());
        }
        let Some(task_id) = self.selected_task_id() else {
            self.cancel_subtask_input();
            return Ok(());
        };
        self.database.create_subtask(&Subtask::new(task_id, user_id, title))?;
        self.cancel_subtask_input();
        self.load_data()?;
        self.select_task_id(task_id);
        self.set_status_message("Subtask added".to_string());
        Ok(())
    }

    pub fn toggle_selected_subtask(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id()?;
        let Some(id) = self.selected_subtask().and_then(|s| s.id) else {
            return Ok(());
        };
        let task_id = self.selected_task_id();
        let done = self.database.toggle_subtask(id, user_id)?;
        self.load_data()?;
        if let Some(task_id) = task_id {
            self.select_task_id(task_id);
        }
        self.set_status_message(if done { "Subtask done" } else { "Subtask reopened" }.to_string());
        Ok(())
    }

    pub fn delete_selected_subtask(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id()?;
        let Some(id) = self.selected_subtask().and_then(|s| s.id) else {
            return Ok(());
        };
        let task_id = self.selected_task_id();
        self.database.delete_subtask(id, user_id)?;
        self.load_data()?;
        if let Some(task_id) = task_id {
            self.select_task_id(task_id);
        }
        self.set_status_message("Subtask deleted".to_string());
        Ok(())
    }

    // ---- filter ----

    pub fn enter_filter_mode(&mut self) {
        self.form.filter_form = Some(FilterFormState::from_filter(&self.filter));
        self.ui.mode = Mode::Filter;
    }

    pub fn exit_filter_mode(&mut self) {
        self.form.filter_form = None;
        self.ui.mode = Mode::View;
    }

    pub fn apply_filter_form(&mut self) {
        if let Some(form) = self.form.filter_form.take() {
            self.filter = form.to_filter();
        }
        self.ui.mode = Mode::View;
        self.ui.selected_index = 0;
        self.ui.board_row = 0;
        self.adjust_selected_index();
        tracing::debug!(filter = %self.filter, "filter applied");
    }

    pub fn clear_filter(&mut self) {
        self.form.filter_form = None;
        self.filter = TaskFilter::default();
        self.ui.mode = Mode::View;
        self.adjust_selected_index();
    }

    // ---- reminders ----

    /// Drive the reminder scheduler from the event loop.
    /// Tasks are reloaded before each tick so edits from other processes are seen.
    pub fn tick_reminders(&mut self) -> Result<(), TuiError> {
        if self.user.is_none() || !self.scheduler.is_running() {
            return Ok(());
        }
        if self.scheduler.until_next() == Some(Duration::ZERO) {
            self.load_data()?;
        }
        let fired = self.scheduler.poll();
        if self.config.reminders.persist_notified {
            // Best effort: a failed write must not hold back the notices
            for key in &fired {
                if let Err(e) = self.database.record_reminder(key, Utc::now()) {
                    tracing::warn!(error = %e, task_id = key.task_id, "failed to record reminder");
                }
            }
        }

        let notices = self.scheduler.dispatcher_mut().platform_mut().drain();
        if let Some(latest) = notices.last() {
            self.set_status_message(format!("{}: {}", latest.title, latest.body));
        }
        self.modals.notices.extend(notices);
        Ok(())
    }

    pub fn dismiss_notice(&mut self) {
        if !self.modals.notices.is_empty() {
            self.modals.notices.remove(0);
        }
    }

    /// Stop background work before the terminal is restored
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
    }
}
