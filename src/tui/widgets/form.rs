use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::style::{Color, Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Constraint, Layout, Direction};
use ratatui::text::{Line, Span};
use crate::Config;
use crate::tui::app::{TaskField, TaskForm};
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color, category_color, priority_color};

/// Styles shared by every form: the focused field is highlighted, the rest dimmed
pub struct FieldStyles {
    pub active: Style,
    pub inactive: Style,
}

impl FieldStyles {
    pub fn from_config(config: &Config) -> Self {
        let active_theme = config.get_active_theme();
        let highlight_bg = parse_color(&active_theme.highlight_bg);
        let highlight_fg = if active_theme.highlight_fg.is_empty() {
            get_contrast_text_color(highlight_bg)
        } else {
            parse_color(&active_theme.highlight_fg)
        };
        Self {
            active: Style::default().bg(highlight_bg).fg(highlight_fg),
            inactive: Style::default()
                .fg(parse_color(&active_theme.fg))
                .add_modifier(Modifier::DIM),
        }
    }

    pub fn pick(&self, active: bool) -> Style {
        if active { self.active } else { self.inactive }
    }
}

/// Draw an editor inside a bordered field, scrolled so the cursor stays visible.
/// The terminal cursor is placed when the field is active.
/// `masked` hides the text (passwords).
pub fn render_input_field(
    f: &mut Frame,
    area: Rect,
    editor: &mut Editor,
    title: &str,
    style: Style,
    active: bool,
    masked: bool,
) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let viewport_height = area.height.saturating_sub(2) as usize;
    editor.update_scroll(viewport_height);
    editor.update_horizontal_scroll(area.width as usize);

    let (_, visible) = editor.get_visible_lines(viewport_height, area.width as usize);
    let lines: Vec<Line> = visible
        .into_iter()
        .map(|line| {
            let shown = if masked { "•".repeat(line.chars().count()) } else { line };
            Line::from(Span::styled(shown, style))
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(paragraph, area);

    if active {
        if let Some(pos) = editor.get_cursor_screen_pos(area, viewport_height) {
            f.set_cursor_position(pos);
        }
    }
}

/// A `< value >` selector field
pub fn render_choice_field(f: &mut Frame, area: Rect, title: &str, value: &str, accent: Color, style: Style, active: bool) {
    let text = if active {
        Line::from(vec![
            Span::styled("< ", style),
            Span::styled(value.to_string(), style.add_modifier(Modifier::BOLD)),
            Span::styled(" >", style),
        ])
    } else {
        Line::from(Span::styled(value.to_string(), style.fg(accent)))
    };
    let paragraph = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(paragraph, area);
}

pub fn render_task_form(f: &mut Frame, area: Rect, form: &mut TaskForm, config: &Config) {
    if area.width < 2 || area.height < 2 {
        return;
    }
    let styles = FieldStyles::from_config(config);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(4),    // Description
            Constraint::Length(3), // Category | Priority
            Constraint::Length(3), // Due date | Due time
            Constraint::Length(3), // Remind
            Constraint::Length(2), // Error / hint
        ])
        .split(area);
    let halves = |row: Rect| {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(row)
    };
    let choice_row = halves(rows[2]);
    let due_row = halves(rows[3]);

    let current = form.current_field;
    let is = |field: TaskField| current == field;

    render_input_field(f, rows[0], &mut form.title, TaskField::Title.label(), styles.pick(is(TaskField::Title)), is(TaskField::Title), false);
    render_input_field(
        f,
        rows[1],
        &mut form.description,
        TaskField::Description.label(),
        styles.pick(is(TaskField::Description)),
        is(TaskField::Description),
        false,
    );
    render_choice_field(
        f,
        choice_row[0],
        TaskField::Category.label(),
        form.category.label(),
        category_color(form.category),
        styles.pick(is(TaskField::Category)),
        is(TaskField::Category),
    );
    render_choice_field(
        f,
        choice_row[1],
        TaskField::Priority.label(),
        form.priority.label(),
        priority_color(form.priority),
        styles.pick(is(TaskField::Priority)),
        is(TaskField::Priority),
    );
    render_input_field(f, due_row[0], &mut form.due_date, TaskField::DueDate.label(), styles.pick(is(TaskField::DueDate)), is(TaskField::DueDate), false);
    render_input_field(f, due_row[1], &mut form.due_time, TaskField::DueTime.label(), styles.pick(is(TaskField::DueTime)), is(TaskField::DueTime), false);
    render_input_field(f, rows[4], &mut form.remind, TaskField::Remind.label(), styles.pick(is(TaskField::Remind)), is(TaskField::Remind), false);

    let footer = match form.error {
        Some(ref error) => Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(
            format!(
                "{}: Save • Tab: Next field • Esc: Cancel",
                crate::utils::format_key_binding_for_display(&config.key_bindings.save)
            ),
            styles.inactive,
        )),
    };
    f.render_widget(Paragraph::new(footer), rows[5]);
}
