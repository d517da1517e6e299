use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::style::Style;
use crate::tui::{App, Layout};
use crate::tui::app::{Focus, Mode, SidebarState, Tab};
use crate::tui::widgets::{
    tabs::render_tabs,
    task_list::render_task_list,
    item_view::render_item_view,
    status_bar::render_status_bar,
    help::render_help,
    form::render_task_form,
    color::parse_color,
    confirm_delete::render_confirm_delete,
    filters_box::render_filters_box,
    filter_modal::render_filter_modal,
    board::render_board,
    stats_view::render_stats_view,
    login::render_login,
    notice::render_notice,
    prompt::render_prompt,
};
use crate::utils::format_key_binding_for_display;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let title = match app.user {
        Some(ref user) => format!("taskboard · {}", user.display_label()),
        None => "taskboard".to_string(),
    };
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(ratatui::layout::Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    if app.ui.mode == Mode::Login {
        render_login(f, layout.inner_area, &mut app.form.login, &app.config);
        return;
    }

    render_tabs(f, layout.tabs_area, app.ui.current_tab, &app.config);

    match app.ui.current_tab {
        Tab::Tasks => render_tasks_tab(f, app, layout),
        Tab::Board => {
            let board = app.board();
            render_board(
                f,
                content_area(layout),
                &board,
                (app.ui.board_column, app.ui.board_row),
                &app.config,
            );
        }
        Tab::Statistics => {
            let stats = app.statistics();
            render_stats_view(f, content_area(layout), &stats, &app.config);
        }
    }

    render_filters_box(f, layout.filters_area, &app.filter, &app.config);

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_deref(), &key_hints, &app.config);

    // Overlays, drawn after the normal content
    match app.ui.mode {
        Mode::Help => render_help(f, f.area(), &app.config),
        Mode::Filter => {
            if let Some(ref state) = app.form.filter_form {
                render_filter_modal(f, f.area(), state, &app.config);
            }
        }
        Mode::SubtaskInput => {
            let context = app
                .selected_task()
                .map(|t| format!("Subtask for: {}", t.title))
                .unwrap_or_default();
            render_prompt(f, f.area(), "New subtask", &context, &mut app.modals.subtask_input, &app.config);
        }
        _ => {}
    }

    if let Some(ref task) = app.modals.delete_confirmation {
        render_confirm_delete(f, f.area(), task, app.modals.delete_modal_selection, &app.config);
    }

    if let Some(notice) = app.modals.notices.first() {
        render_notice(f, f.area(), notice, app.modals.notices.len(), &app.config);
    }
}

/// Board and statistics use the sidebar and main pane as one area
fn content_area(layout: &Layout) -> Rect {
    layout.sidebar_area.union(layout.main_area)
}

fn render_tasks_tab(f: &mut Frame, app: &mut App, layout: &Layout) {
    if app.ui.sidebar_state == SidebarState::Expanded && layout.sidebar_area.width > 0 {
        let tasks = app.filter.apply(&app.tasks);
        let focused = app.ui.focus == Focus::List && app.ui.mode == Mode::View;
        render_task_list(
            f,
            layout.sidebar_area,
            &tasks,
            app.tasks.len(),
            &mut app.ui.list_state,
            &app.config,
            app.ui.list_view_mode,
            focused,
        );
    }

    if app.ui.mode == Mode::Create {
        if let Some(ref mut form) = app.form.task_form {
            render_task_form(f, layout.main_area, form, &app.config);
            return;
        }
    }

    match app.selected_task() {
        Some(task) => render_item_view(
            f,
            layout.main_area,
            task,
            &app.config,
            app.ui.item_view_scroll,
            app.ui.subtask_index,
            app.ui.focus == Focus::Subtasks,
        ),
        None => {
            let fg_color = parse_color(&app.config.get_active_theme().fg);
            let text = if app.tasks.is_empty() {
                "No tasks yet. Press the new-task key to add one."
            } else {
                "Select a task to view details"
            };
            let paragraph = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title("Details"))
                .style(Style::default().fg(fg_color));
            f.render_widget(paragraph, layout.main_area);
        }
    }
}

fn get_key_hints(app: &App) -> Vec<String> {
    let keys = &app.config.key_bindings;
    let key = |binding: &str| format_key_binding_for_display(binding);

    if !app.modals.notices.is_empty() {
        return vec!["Enter/Esc: Dismiss reminder".to_string()];
    }
    if app.modals.delete_confirmation.is_some() {
        return vec![
            "↑/↓: Choose".to_string(),
            "Enter: Confirm".to_string(),
            "Esc: Cancel".to_string(),
        ];
    }

    match app.ui.mode {
        Mode::Login => vec!["Esc: Quit".to_string()],
        Mode::Help => vec![format!("Esc or {}: Exit help", key(&keys.help))],
        Mode::Create => vec![
            "Tab: Next field".to_string(),
            "Shift+Tab: Previous field".to_string(),
            "←/→: Change choice".to_string(),
            format!("{}: Save", key(&keys.save)),
            "Esc: Cancel".to_string(),
        ],
        Mode::Filter => vec![
            "↑/↓: Navigate fields".to_string(),
            "←/→: Change value".to_string(),
            "Enter: Apply".to_string(),
            "Esc: Cancel".to_string(),
        ],
        Mode::SubtaskInput => vec!["Enter: Add".to_string(), "Esc: Cancel".to_string()],
        Mode::View => {
            let mut hints = vec![
                format!("{}: Quit", key(&keys.quit)),
                format!("{}: New", key(&keys.new)),
                format!("{}: Edit", key(&keys.edit)),
                format!("{}: Delete", key(&keys.delete)),
                format!("{}: Done", key(&keys.toggle_task_status)),
                format!("{}: Filters", key(&keys.filter)),
            ];
            match app.ui.current_tab {
                Tab::Tasks => {
                    hints.push(format!("{}: Subtask", key(&keys.add_subtask)));
                    hints.push("Tab: Focus subtasks".to_string());
                    hints.push(format!("{}: Toggle sidebar", key(&keys.toggle_sidebar)));
                    hints.push(format!("{}: List view", key(&keys.toggle_list_view)));
                }
                Tab::Board => {
                    hints.push("Tab: Next column".to_string());
                    hints.push(format!("{}/{}: Move task", key(&keys.move_left), key(&keys.move_right)));
                }
                Tab::Statistics => {}
            }
            hints.push(format!("{}: Theme", key(&keys.cycle_theme)));
            hints.push(format!("{}: Sign out", key(&keys.sign_out)));
            hints.push(format!("{}: Help", key(&keys.help)));
            hints
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;
    use crate::{Config, Database};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn signed_in_app() -> App {
        let mut config = Config::default();
        config.reminders.sound = false;
        let db = Database::open_in_memory().unwrap();
        Auth::new().sign_up(&db, "ada@example.com", "secret1").unwrap();
        App::new(config, db).unwrap()
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn draws_every_tab_without_panicking() {
        let mut app = signed_in_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        for tab in Tab::ALL {
            app.switch_tab(tab);
            terminal
                .draw(|f| {
                    let layout = Layout::calculate(f.area(), app.config.sidebar_width_percent, false);
                    render(f, &mut app, &layout);
                })
                .unwrap();
        }
        assert!(buffer_text(&terminal).contains("ada@example.com"));
    }

    #[test]
    fn login_screen_when_signed_out() {
        let db = Database::open_in_memory().unwrap();
        let mut app = App::new(Config::default(), db).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| {
                let layout = Layout::calculate(f.area(), 30, false);
                render(f, &mut app, &layout);
            })
            .unwrap();
        assert!(buffer_text(&terminal).contains("Welcome to taskboard"));
    }

    #[test]
    fn hints_follow_the_tab() {
        let mut app = signed_in_app();
        app.switch_tab(Tab::Board);
        assert!(get_key_hints(&app).iter().any(|h| h.contains("Move task")));
        app.switch_tab(Tab::Tasks);
        assert!(get_key_hints(&app).iter().any(|h| h.contains("Subtask")));
    }
}
