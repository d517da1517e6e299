use ratatui::widgets::{Block, Borders, Paragraph, Clear};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment, Constraint, Layout, Direction};
use ratatui::text::{Line, Span};
use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::form::{render_input_field, FieldStyles};
use crate::tui::widgets::popup_area;

/// Single-line input popup (new subtask title)
pub fn render_prompt(f: &mut Frame, area: Rect, title: &str, context: &str, editor: &mut Editor, config: &Config) {
    let active_theme = config.get_active_theme();
    let base = Style::default()
        .fg(parse_color(&active_theme.fg))
        .bg(parse_color(&active_theme.bg));
    let styles = FieldStyles::from_config(config);

    let popup_area = popup_area(area, 60, 30);
    f.render_widget(Clear, popup_area);
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .title_alignment(Alignment::Center)
        .style(base);
    let inner = outer.inner(popup_area);
    f.render_widget(outer, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(context.to_string(), base.add_modifier(Modifier::BOLD)))),
        rows[0],
    );
    render_input_field(f, rows[1], editor, "Title", styles.active, true, false);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled("Enter: add • Esc: cancel", styles.inactive))),
        rows[2],
    );
}
