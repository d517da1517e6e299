use ratatui::widgets::{Block, Borders, Paragraph, Clear};
use ratatui::style::{Color, Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment, Constraint, Layout, Direction};
use ratatui::text::{Line, Span};
use crate::filter::{CategoryFilter, PriorityFilter, StatusFilter};
use crate::Config;
use crate::tui::app::{FilterFormField, FilterFormState};
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};
use crate::tui::widgets::popup_area;

/// Filter popup: one selector per dimension, then Apply / Clear / Cancel
pub fn render_filter_modal(f: &mut Frame, area: Rect, state: &FilterFormState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let base = Style::default().fg(fg_color).bg(bg_color);
    let selected = Style::default().fg(highlight_fg).bg(highlight_bg);

    let popup_area = popup_area(area, 70, 60);
    f.render_widget(Clear, popup_area);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("Filters")
        .title_alignment(Alignment::Center)
        .style(base);
    let inner_area = outer_block.inner(popup_area);
    f.render_widget(outer_block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Category
            Constraint::Length(3), // Priority
            Constraint::Length(3), // Status
            Constraint::Length(3), // Buttons
            Constraint::Min(0),
        ])
        .split(inner_area);

    let selectors = [
        (
            FilterFormField::Category,
            "Category",
            options_line(&CategoryFilter::options(), state.category, |c| c.label(), base, selected),
        ),
        (
            FilterFormField::Priority,
            "Priority",
            options_line(&PriorityFilter::options(), state.priority, |p| p.label(), base, selected),
        ),
        (
            FilterFormField::Status,
            "Status",
            options_line(&StatusFilter::options(), state.status, |s| s.label(), base, selected),
        ),
    ];
    for (row, (field, title, line)) in selectors.into_iter().enumerate() {
        let focused = state.current_field == field;
        let mut block = Block::default().borders(Borders::ALL).title(title).style(base);
        if focused {
            block = block.border_style(Style::default().fg(highlight_bg).add_modifier(Modifier::BOLD));
        }
        f.render_widget(Paragraph::new(line).block(block), rows[row]);
    }

    let buttons = [
        (FilterFormField::Apply, "Apply"),
        (FilterFormField::Clear, "Clear"),
        (FilterFormField::Cancel, "Cancel"),
    ];
    let mut spans = Vec::new();
    for (field, label) in buttons {
        let style = if state.current_field == field { selected } else { base };
        spans.push(Span::styled(format!("[ {} ]", label), style));
        spans.push(Span::raw("  "));
    }
    let hint = Line::from(Span::styled(
        "↑↓ field • ←→ value • Enter apply • Esc cancel",
        base.add_modifier(Modifier::DIM),
    ));
    let buttons_paragraph = Paragraph::new(vec![Line::from(spans), Line::from(""), hint])
        .alignment(Alignment::Center)
        .style(base);
    f.render_widget(buttons_paragraph, rows[3]);
}

/// All options on one line with the current one highlighted
fn options_line<T: Copy + PartialEq>(
    options: &[T],
    current: T,
    label: impl Fn(&T) -> &'static str,
    base: Style,
    selected: Style,
) -> Line<'static> {
    let mut spans = Vec::new();
    for option in options {
        let style = if *option == current { selected } else { base.fg(Color::Gray) };
        spans.push(Span::styled(format!(" {} ", label(option)), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}
