use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::style::Style;
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::filter::TaskFilter;
use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::utils::format_key_binding_for_display;

pub fn render_filters_box(f: &mut Frame, area: Rect, filter: &TaskFilter, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let title = format!("{}: Filters", format_key_binding_for_display(&config.key_bindings.filter));
    let paragraph = Paragraph::new(filter.summary())
        .block(Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color))
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}
