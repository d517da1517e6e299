use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use crate::kanban::Direction;
use crate::tui::App;
use crate::tui::app::{FilterFormField, Focus, LoginField, Mode, SidebarState, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{parse_key_binding, ParsedKeyBinding};

const POLL_INTERVAL: Duration = Duration::from_millis(16);
const SCROLL_STEP: usize = 5;

/// Restores the terminal on drop, so a panic does not leave it in raw mode
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; the guard does nothing on drop afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before the alternate screen so the message stays visible
    let (width, height) = terminal_size()?;
    if !Layout::fits(width, height) {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width,
            height,
            Layout::MIN_WIDTH + 2,
            Layout::MIN_HEIGHT + 2
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut app, &mut terminal);

    app.shutdown();
    guard.restore()?;
    result
}

fn event_loop(app: &mut App, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<(), TuiError> {
    loop {
        app.check_status_message_timeout();

        if let Err(e) = app.tick_reminders() {
            tracing::warn!(error = %e, "reminder tick failed");
            app.set_status_message(format!("Reminder check failed: {}", e));
        }
        app.handle_auth_events()?;

        terminal.draw(|f| {
            let layout = Layout::calculate(
                f.area(),
                app.config.sidebar_width_percent,
                app.ui.sidebar_state == SidebarState::Collapsed,
            );
            crate::tui::render::render(f, app, &layout);
        })?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                // Press only; Windows also reports releases
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(app, key_event)? {
                        return Ok(());
                    }
                }
                // Resize is picked up by the next draw
                _ => {}
            }
        }
    }
}

/// Returns true when the user asked to quit
fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if !app.modals.notices.is_empty() {
        if matches!(key_event.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_notice();
        }
        return Ok(false);
    }

    if app.modals.delete_confirmation.is_some() {
        handle_delete_confirmation_modal(app, key_event);
        return Ok(false);
    }

    match app.ui.mode {
        Mode::Login => handle_login_mode(app, key_event),
        Mode::Create => handle_create_mode(app, key_event),
        Mode::Filter => {
            handle_filter_mode(app, key_event);
            Ok(false)
        }
        Mode::Help => handle_help_mode(app, key_event),
        Mode::SubtaskInput => {
            handle_subtask_input_mode(app, key_event);
            Ok(false)
        }
        Mode::View => handle_global_key_bindings(app, key_event),
    }
}

/// Show a failed action in the status bar instead of leaving the UI
fn report(app: &mut App, action: &str, result: Result<(), TuiError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, action, "action failed");
        app.set_status_message(format!("Failed to {}: {}", action, e));
    }
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
            app.modals.delete_modal_selection = 1 - app.modals.delete_modal_selection.min(1);
        }
        KeyCode::Enter => {
            if app.modals.delete_modal_selection == 0 {
                let result = app.confirm_delete();
                report(app, "delete task", result);
            } else {
                app.cancel_delete();
            }
        }
        KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

fn handle_login_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let login = &mut app.form.login;
    match key_event.code {
        // Printable keys go to the fields, so Esc is the way out
        KeyCode::Esc => return Ok(true),
        KeyCode::Tab | KeyCode::Down => login.next_field(),
        KeyCode::BackTab | KeyCode::Up => login.prev_field(),
        KeyCode::Left if login.current_field == LoginField::Action => login.cycle_action(false),
        KeyCode::Right if login.current_field == LoginField::Action => login.cycle_action(true),
        KeyCode::Enter => app.submit_login()?,
        _ => {
            if let Some(editor) = login.current_editor_mut() {
                editor.handle_key(key_event, false);
            }
        }
    }
    Ok(false)
}

fn handle_create_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let save_binding = binding(&app.config.key_bindings.save)?;
    if matches_key_event(key_event, &save_binding) {
        let result = app.save_form();
        report(app, "save task", result);
        return Ok(false);
    }

    let Some(form) = app.form.task_form.as_mut() else {
        app.ui.mode = Mode::View;
        return Ok(false);
    };
    match key_event.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Tab => form.next_field(),
        KeyCode::BackTab => form.prev_field(),
        KeyCode::Enter if !form.is_multi_line() => form.next_field(),
        code => {
            // Left/Right step through choice fields and move the cursor elsewhere
            let cycled = matches!(code, KeyCode::Left | KeyCode::Right) && form.cycle_choice(code == KeyCode::Right);
            if !cycled {
                let multi_line = form.is_multi_line();
                let edited = form
                    .current_editor_mut()
                    .is_some_and(|editor| editor.handle_key(key_event, multi_line));
                if edited {
                    form.error = None;
                }
            }
        }
    }
    Ok(false)
}

fn handle_filter_mode(app: &mut App, key_event: KeyEvent) {
    let Some(state) = app.form.filter_form.as_mut() else {
        app.exit_filter_mode();
        return;
    };
    match key_event.code {
        KeyCode::Esc => app.exit_filter_mode(),
        KeyCode::Down | KeyCode::Tab => state.next_field(),
        KeyCode::Up | KeyCode::BackTab => state.prev_field(),
        KeyCode::Left => state.cycle_value(false),
        KeyCode::Right => state.cycle_value(true),
        KeyCode::Enter => match state.current_field {
            FilterFormField::Clear => app.clear_filter(),
            FilterFormField::Cancel => app.exit_filter_mode(),
            _ => app.apply_filter_form(),
        },
        _ => {}
    }
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let help_binding = binding(&app.config.key_bindings.help)?;
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &help_binding) {
        app.ui.mode = Mode::View;
    }
    Ok(false)
}

fn handle_subtask_input_mode(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Esc => app.cancel_subtask_input(),
        KeyCode::Enter => {
            let result = app.submit_subtask();
            report(app, "add subtask", result);
        }
        _ => {
            app.modals.subtask_input.handle_key(key_event, false);
        }
    }
}

fn handle_global_key_bindings(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = app.config.key_bindings.clone();

    if matches_key_event(key_event, &binding(&keys.quit)?) {
        return Ok(true);
    }
    if matches_key_event(key_event, &binding(&keys.toggle_sidebar)?) {
        app.toggle_sidebar();
        return Ok(false);
    }

    if matches_key_event(key_event, &binding(&keys.tab_left)?) {
        app.prev_tab();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.tab_right)?) {
        app.next_tab();
        return Ok(false);
    }
    for (key, tab) in [(&keys.tab_1, Tab::Tasks), (&keys.tab_2, Tab::Board), (&keys.tab_3, Tab::Statistics)] {
        if matches_key_event(key_event, &binding(key)?) {
            app.switch_tab(tab);
            return Ok(false);
        }
    }

    if matches_key_event(key_event, &binding(&keys.help)?) {
        app.ui.mode = Mode::Help;
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.filter)?) {
        app.enter_filter_mode();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.cycle_theme)?) {
        app.cycle_theme();
        return Ok(false);
    }
    if matches_key_event(key_event, &binding(&keys.sign_out)?) {
        app.sign_out()?;
        return Ok(false);
    }

    // Task actions have nothing to act on in the statistics view
    if app.ui.current_tab != Tab::Statistics {
        let subtasks_focused = app.ui.current_tab == Tab::Tasks && app.ui.focus == Focus::Subtasks;

        if matches_key_event(key_event, &binding(&keys.new)?) {
            app.enter_create_mode();
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.edit)?) {
            app.enter_edit_mode();
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.delete)?) {
            if subtasks_focused {
                let result = app.delete_selected_subtask();
                report(app, "delete subtask", result);
            } else {
                app.request_delete();
            }
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.toggle_task_status)?) {
            let result = if subtasks_focused {
                app.toggle_selected_subtask()
            } else {
                app.toggle_selected_task()
            };
            report(app, "update task", result);
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.select)?) {
            if subtasks_focused {
                let result = app.toggle_selected_subtask();
                report(app, "update subtask", result);
            } else {
                app.enter_edit_mode();
            }
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.move_left)?) {
            let result = app.move_selected_task(Direction::Left);
            report(app, "move task", result);
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.move_right)?) {
            let result = app.move_selected_task(Direction::Right);
            report(app, "move task", result);
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.copy)?) {
            app.copy_selected_task();
            return Ok(false);
        }
    }

    if app.ui.current_tab == Tab::Tasks {
        if matches_key_event(key_event, &binding(&keys.add_subtask)?) {
            app.enter_subtask_input();
            return Ok(false);
        }
        if matches_key_event(key_event, &binding(&keys.toggle_list_view)?) {
            app.toggle_list_view();
            return Ok(false);
        }
    }

    if key_event.code == KeyCode::Up || matches_key_event(key_event, &binding(&keys.list_up)?) {
        app.move_selection_up();
        return Ok(false);
    }
    if key_event.code == KeyCode::Down || matches_key_event(key_event, &binding(&keys.list_down)?) {
        app.move_selection_down();
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::PageUp => {
            app.ui.item_view_scroll = app.ui.item_view_scroll.saturating_sub(SCROLL_STEP);
        }
        KeyCode::PageDown => {
            app.ui.item_view_scroll += SCROLL_STEP;
        }
        _ => {}
    }
    Ok(false)
}

fn binding(key: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key).map_err(TuiError::KeyBindingError)
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Ctrl on Windows/Linux, Ctrl or Option on macOS
    let has_primary_mod = crate::utils::has_primary_modifier(key_event.modifiers);
    if binding.requires_ctrl != has_primary_mod {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;
    use crate::reminder::Notice;
    use crate::{Config, Database};
    use chrono::Utc;
    use crossterm::event::KeyModifiers;

    fn signed_in_app() -> App {
        let mut config = Config::default();
        config.reminders.sound = false;
        let db = Database::open_in_memory().unwrap();
        Auth::new().sign_up(&db, "ana@example.com", "secret1").unwrap();
        App::new(config, db).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn ctrl(app: &mut App, c: char) {
        handle_key_event(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)).unwrap();
    }

    #[test]
    fn bindings_respect_the_primary_modifier() {
        let save = parse_key_binding("Ctrl+s").unwrap();
        assert!(matches_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL), &save));
        assert!(!matches_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE), &save));

        let new = parse_key_binding("n").unwrap();
        assert!(matches_key_event(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE), &new));
        assert!(!matches_key_event(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL), &new));
    }

    #[test]
    fn quit_key_ends_the_loop() {
        let mut app = signed_in_app();
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn typing_q_into_the_form_does_not_quit() {
        let mut app = signed_in_app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.ui.mode, Mode::Create);
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.ui.mode, Mode::View);
    }

    #[test]
    fn create_and_complete_a_task_from_the_keyboard() {
        let mut app = signed_in_app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Buy milk");
        ctrl(&mut app, 's');
        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.tasks[0].title, "Buy milk");

        press(&mut app, KeyCode::Char(' '));
        assert!(app.tasks[0].completed);
    }

    #[test]
    fn login_form_takes_text_and_esc_quits() {
        let db = Database::open_in_memory().unwrap();
        let mut app = App::new(Config::default(), db).unwrap();
        assert_eq!(app.ui.mode, Mode::Login);

        type_text(&mut app, "new@example.com");
        assert_eq!(app.form.login.email.text(), "new@example.com");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "secret1");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ui.mode, Mode::View);
        assert!(app.user.is_some());

        app.sign_out().unwrap();
        assert!(press(&mut app, KeyCode::Esc));
    }

    #[test]
    fn filter_modal_applies_the_chosen_category() {
        let mut app = signed_in_app();
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.ui.mode, Mode::Filter);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ui.mode, Mode::View);
        assert!(app.filter.is_active());

        press(&mut app, KeyCode::Char('f'));
        for _ in 0..4 {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Enter);
        assert!(!app.filter.is_active());
    }

    #[test]
    fn delete_asks_first() {
        let mut app = signed_in_app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Old chore");
        ctrl(&mut app, 's');

        press(&mut app, KeyCode::Char('d'));
        assert!(app.modals.delete_confirmation.is_some());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.tasks.len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Enter);
        assert!(app.tasks.is_empty());
    }

    #[test]
    fn notices_swallow_keys_until_dismissed() {
        let mut app = signed_in_app();
        app.modals.notices.push(Notice {
            title: "Task due".to_string(),
            body: "Pay rent".to_string(),
            at: Utc::now(),
        });
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Enter);
        assert!(app.modals.notices.is_empty());
        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
