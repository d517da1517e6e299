use ratatui::widgets::{Block, Borders, List, ListItem, StatefulWidget, Scrollbar, ScrollbarState, ScrollbarOrientation};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Direction, Constraint};
use ratatui::widgets::ListState;
use ratatui::text::{Line, Span};
use chrono::{DateTime, Utc};
use crate::models::{Priority, Task};
use crate::Config;
use crate::tui::app::ListViewMode;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color, priority_color};
use crate::utils::format_local;

/// Truncate to `max_width` characters, marking the cut with "..."
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
}

pub fn status_indicator(task: &Task) -> &'static str {
    if task.completed { "✓" } else { "○" }
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!",
        Priority::Medium => "! ",
        Priority::Low => "  ",
    }
}

/// `○ !! Title [2025-06-02 10:00]`
pub fn task_line(task: &Task) -> String {
    let due = task.due_at.as_ref().map(|d| format!(" [{}]", format_local(d))).unwrap_or_default();
    format!("{} {} {}{}", status_indicator(task), priority_marker(task.priority), task.title, due)
}

/// Second line of the two-line view
pub fn detail_line(task: &Task, now: DateTime<Utc>) -> String {
    let mut parts = vec![task.category.label().to_string(), task.status.label().to_string()];
    let (done, total) = task.subtask_progress();
    if total > 0 {
        parts.push(format!("{}/{} subtasks", done, total));
    }
    if let Some(minutes) = task.remind_before_minutes {
        parts.push(format!("remind {}m before", minutes));
    }
    if task.is_overdue(now) {
        parts.push("OVERDUE".to_string());
    }
    format!("   {}", parts.join(" · "))
}

#[allow(clippy::too_many_arguments)]
pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    tasks: &[&Task],
    total_count: usize,
    list_state: &mut ListState,
    config: &Config,
    view_mode: ListViewMode,
    focused: bool,
) {
    // 2 for borders, 2 for padding
    let max_width = area.width.saturating_sub(4) as usize;
    let now = Utc::now();

    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = if active_theme.highlight_fg.is_empty() {
        get_contrast_text_color(highlight_bg)
    } else {
        parse_color(&active_theme.highlight_fg)
    };

    let items: Vec<ListItem> = tasks
        .iter()
        .map(|task| {
            let mut style = Style::default().fg(priority_color(task.priority));
            if task.completed {
                style = Style::default().fg(fg_color).add_modifier(Modifier::CROSSED_OUT);
            }
            let first = Line::from(Span::styled(truncate(&task_line(task), max_width), style));
            match view_mode {
                ListViewMode::Simple => ListItem::new(first),
                ListViewMode::TwoLine => ListItem::new(vec![
                    first,
                    Line::from(truncate(&detail_line(task, now), max_width)),
                ]),
            }
        })
        .collect();
    let total_items = items.len();

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Scrollbar
        ])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let title = format!("Tasks ({} of {})", tasks.len(), total_count);
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block = block.border_style(Style::default().add_modifier(Modifier::BOLD));
    }
    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(fg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    let list_inner_height = list_area.height.saturating_sub(2) as usize;
    let items_per_line = match view_mode {
        ListViewMode::TwoLine => 2,
        ListViewMode::Simple => 1,
    };
    let visible_items = list_inner_height / items_per_line;

    if total_items > visible_items && visible_items > 0 && scrollbar_area.width > 0 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let selected_index = list_state.selected().unwrap_or(0);
        let scroll_position = selected_index.saturating_sub(visible_items - 1);

        let mut scrollbar_state = ScrollbarState::new(total_items)
            .viewport_content_length(visible_items)
            .position(scroll_position);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("ação rápida", 7), "ação...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn detail_line_mentions_progress_and_overdue() {
        let now = Utc::now();
        let mut task = Task::new(1, "x".to_string());
        task.due_at = Some(now - Duration::minutes(5));
        task.remind_before_minutes = Some(15);
        let line = detail_line(&task, now);
        assert!(line.contains("Work"));
        assert!(line.contains("remind 15m before"));
        assert!(line.ends_with("OVERDUE"));
    }

    #[test]
    fn completed_task_line_is_checked() {
        let mut task = Task::new(1, "Done thing".to_string());
        task.set_completed(true);
        assert!(task_line(&task).starts_with("✓"));
    }
}
