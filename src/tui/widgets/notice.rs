use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use ratatui::text::{Line, Span};
use crate::reminder::Notice;
use crate::Config;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};
use crate::tui::widgets::popup_area;
use crate::utils::format_local;

/// Reminder popup for the oldest unacknowledged notice
pub fn render_notice(f: &mut Frame, area: Rect, notice: &Notice, pending: usize, config: &Config) {
    let active_theme = config.get_active_theme();
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let text_fg = get_contrast_text_color(highlight_bg);
    let style = Style::default().fg(text_fg).bg(highlight_bg);

    let popup_area = popup_area(area, 50, 30);
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(notice.title.clone(), style.add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(notice.body.clone(), style)),
        Line::from(""),
        Line::from(Span::styled(format!("at {}", format_local(&notice.at)), style.add_modifier(Modifier::DIM))),
    ];
    if pending > 1 {
        lines.push(Line::from(Span::styled(format!("{} more waiting", pending - 1), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Enter / Esc to dismiss", style)));

    let paragraph = Paragraph::new(lines)
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Reminder")
            .title_alignment(Alignment::Center)
            .style(style))
        .style(style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup_area);
}
