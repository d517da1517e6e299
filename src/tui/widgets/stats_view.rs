use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Direction, Constraint};
use ratatui::text::{Line, Span};
use crate::models::{Category, Priority, Status};
use crate::stats::Statistics;
use crate::Config;
use crate::tui::widgets::color::{parse_color, category_color, priority_color, status_color};

pub fn render_stats_view(f: &mut Frame, area: Rect, stats: &Statistics, config: &Config) {
    let fg_color = parse_color(&config.get_active_theme().fg);
    let base = Style::default().fg(fg_color);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Completion gauge
            Constraint::Length(6), // Totals
            Constraint::Min(4),    // Breakdowns
        ])
        .split(area);

    let percent = stats.completion_rate.clamp(0.0, 100.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Completion"))
        .gauge_style(Style::default().fg(status_color(Status::Done)))
        .ratio(percent / 100.0)
        .label(format!("{:.2}% ({}/{})", stats.completion_rate, stats.completed, stats.total));
    f.render_widget(gauge, rows[0]);

    let totals = vec![
        Line::from(format!("Total tasks: {}", stats.total)),
        Line::from(format!("Overdue: {}    Due today: {}", stats.overdue, stats.due_today)),
        Line::from(format!("With reminder: {}", stats.with_reminder)),
        Line::from(format!("Subtasks done: {}/{}", stats.subtasks_done, stats.subtasks_total)),
    ];
    f.render_widget(
        Paragraph::new(totals).style(base).block(Block::default().borders(Borders::ALL).title("Overview")),
        rows[1],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(rows[2]);

    let by_category: Vec<Line> = Category::ALL
        .iter()
        .map(|c| count_line(c.label(), stats.category_count(*c), category_color(*c)))
        .collect();
    let by_priority: Vec<Line> = Priority::ALL
        .iter()
        .map(|p| count_line(p.label(), stats.priority_count(*p), priority_color(*p)))
        .collect();
    let by_status: Vec<Line> = Status::ALL
        .iter()
        .map(|s| count_line(s.label(), stats.status_count(*s), status_color(*s)))
        .collect();

    for (i, (title, lines)) in [("By category", by_category), ("By priority", by_priority), ("By status", by_status)]
        .into_iter()
        .enumerate()
    {
        f.render_widget(
            Paragraph::new(lines).style(base).block(Block::default().borders(Borders::ALL).title(title)),
            columns[i],
        );
    }
}

fn count_line(label: &'static str, count: usize, color: ratatui::style::Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(count.to_string()),
    ])
}
