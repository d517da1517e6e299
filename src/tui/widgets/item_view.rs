use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Wrap};
use ratatui::style::{Modifier, Style};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout as RatLayout, Direction, Constraint};
use ratatui::text::{Text, Line, Span};
use crate::models::Task;
use crate::Config;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::utils::format_local;
use ratskin::RatSkin;
use termimad::minimad::Text as MinimadText;
use std::cmp;

/// Task details as markdown. Also what the copy action puts on the clipboard.
pub fn get_content_string(task: &Task) -> String {
    let mut content = format!("**Title:** {}\n", task.title);
    content.push_str(&format!("**Status:** {}\n", task.status.label()));
    content.push_str(&format!("**Category:** {}\n", task.category.label()));
    content.push_str(&format!("**Priority:** {}\n", task.priority.label()));

    if let Some(ref due) = task.due_at {
        content.push_str(&format!("**Due:** {}\n", format_local(due)));
    }
    if let Some(minutes) = task.remind_before_minutes {
        content.push_str(&format!("**Reminder:** {} minutes before\n", minutes));
    }

    if let Some(ref description) = task.description {
        content.push_str("\n**Description:**\n\n");
        content.push_str(description);
        content.push('\n');
    }

    if !task.subtasks.is_empty() {
        let (done, total) = task.subtask_progress();
        content.push_str(&format!("\n**Subtasks:** {}/{}\n", done, total));
        for subtask in &task.subtasks {
            let mark = if subtask.completed { "x" } else { " " };
            content.push_str(&format!("* [{}] {}\n", mark, subtask.title));
        }
    }

    content
}

/// Markdown body without the subtask section, which gets its own selectable list
fn details_markdown(task: &Task) -> String {
    let mut copy = task.clone();
    copy.subtasks.clear();
    get_content_string(&copy)
}

pub fn render_item_view(
    f: &mut Frame,
    area: Rect,
    task: &Task,
    config: &Config,
    scroll_offset: usize,
    subtask_index: usize,
    subtasks_focused: bool,
) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let subtask_height = if task.subtasks.is_empty() {
        0
    } else {
        cmp::min(task.subtasks.len() as u16 + 2, area.height / 2)
    };
    let vertical = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(subtask_height)])
        .split(area);

    render_details(f, vertical[0], task, config, scroll_offset);
    if subtask_height > 0 {
        render_subtasks(f, vertical[1], task, config, subtask_index, subtasks_focused);
    }
}

fn render_details(f: &mut Frame, area: Rect, task: &Task, config: &Config, scroll_offset: usize) {
    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Scrollbar
        ])
        .split(area);
    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let viewport_height = area.height.saturating_sub(2) as usize;
    let text_width: u16 = content_area.width.saturating_sub(2);

    // ratskin needs the width up front for wrapping
    let markdown = details_markdown(task);
    let content_lines = RatSkin::default().parse(MinimadText::from(markdown.as_str()), text_width);
    let lines: Vec<Line> = content_lines
        .into_iter()
        .map(|line| {
            let spans: Vec<Span> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect();

    let total_lines = lines.len();
    let max_scroll = total_lines.saturating_sub(viewport_height);
    let scroll_offset = cmp::min(scroll_offset, max_scroll);
    let end_line = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible_text = Text::from(lines[scroll_offset.min(end_line)..end_line].to_vec());

    // trim: false keeps list indentation
    let base_style = Style::default().fg(parse_color(&config.get_active_theme().fg));
    let paragraph = Paragraph::new(visible_text)
        .block(Block::default().borders(Borders::ALL).title("Task"))
        .style(base_style)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

fn render_subtasks(
    f: &mut Frame,
    area: Rect,
    task: &Task,
    config: &Config,
    subtask_index: usize,
    focused: bool,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);

    let items: Vec<ListItem> = task
        .subtasks
        .iter()
        .map(|s| {
            let mark = if s.completed { "[x]" } else { "[ ]" };
            let style = if s.completed {
                Style::default().fg(fg_color).add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(fg_color)
            };
            ListItem::new(Line::from(Span::styled(format!("{} {}", mark, s.title), style)))
        })
        .collect();

    let (done, total) = task.subtask_progress();
    let mut block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Subtasks {}/{}", done, total));
    let mut list_state = ListState::default();
    if focused {
        block = block.border_style(Style::default().add_modifier(Modifier::BOLD));
        list_state.select(Some(subtask_index));
    }
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(get_contrast_text_color(highlight_bg)).bg(highlight_bg));
    StatefulWidget::render(list, area, f.buffer_mut(), &mut list_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subtask;

    #[test]
    fn content_lists_subtasks_with_checkboxes() {
        let mut task = Task::new(1, "Trip".to_string());
        task.description = Some("Beach weekend".to_string());
        let mut packed = Subtask::new(2, 1, "Pack".to_string());
        packed.completed = true;
        task.subtasks = vec![packed, Subtask::new(2, 1, "Book hotel".to_string())];

        let content = get_content_string(&task);
        assert!(content.starts_with("**Title:** Trip\n"));
        assert!(content.contains("Beach weekend"));
        assert!(content.contains("**Subtasks:** 1/2"));
        assert!(content.contains("* [x] Pack"));
        assert!(content.contains("* [ ] Book hotel"));
        assert!(!details_markdown(&task).contains("Subtasks"));
    }
}
