use ratatui::widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Direction, Constraint};
use ratatui::text::{Line, Span};
use crate::kanban::Board;
use crate::Config;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color, priority_color, status_color};
use crate::tui::widgets::task_list::truncate;
use crate::utils::format_local;

/// Kanban view: one column per status. `selected` is (column, row).
pub fn render_board(f: &mut Frame, area: Rect, board: &Board, selected: (usize, usize), config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (index, (status, tasks)) in board.columns().enumerate() {
        let column_area = columns[index];
        let max_width = column_area.width.saturating_sub(2) as usize;
        let focused = index == selected.0;

        let items: Vec<ListItem> = tasks
            .iter()
            .map(|task| {
                let mut lines = vec![Line::from(Span::styled(
                    truncate(&task.title, max_width),
                    Style::default().fg(priority_color(task.priority)).add_modifier(Modifier::BOLD),
                ))];
                if let Some(ref due) = task.due_at {
                    lines.push(Line::from(truncate(&format!("  {}", format_local(due)), max_width)));
                }
                let (done, total) = task.subtask_progress();
                if total > 0 {
                    lines.push(Line::from(format!("  {}/{} subtasks", done, total)));
                }
                ListItem::new(lines)
            })
            .collect();

        let title = Line::from(vec![
            Span::styled(status.label(), Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD)),
            Span::raw(format!(" ({})", tasks.len())),
        ]);
        let mut block = Block::default().borders(Borders::ALL).title(title);
        if focused {
            block = block.border_style(Style::default().fg(highlight_bg).add_modifier(Modifier::BOLD));
        }

        let mut list_state = ListState::default();
        if focused && !tasks.is_empty() {
            list_state.select(Some(selected.1));
        }
        let list = List::new(items)
            .block(block)
            .style(Style::default().fg(fg_color))
            .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));
        StatefulWidget::render(list, column_area, f.buffer_mut(), &mut list_state);
    }
}
