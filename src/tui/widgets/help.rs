use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::style::Style;
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 80);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Help - Key Bindings")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}

fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Switch tabs\n", key(&kb.tab_left), key(&kb.tab_right)));
    text.push_str(&format!(
        "  {} / {} / {}: Tasks / Board / Statistics\n",
        key(&kb.tab_1),
        key(&kb.tab_2),
        key(&kb.tab_3)
    ));
    text.push_str(&format!("  {} / {}: Move selection up/down\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str("  Tab: Switch between list and subtasks (board: next column)\n");
    text.push('\n');

    text.push_str("Tasks:\n");
    text.push_str(&format!("  {}: New task\n", key(&kb.new)));
    text.push_str(&format!("  {}: Edit selected task\n", key(&kb.edit)));
    text.push_str(&format!("  {}: Delete selected task or subtask\n", key(&kb.delete)));
    text.push_str(&format!("  {}: Toggle done (task or subtask)\n", key(&kb.toggle_task_status)));
    text.push_str(&format!("  {}: Add subtask\n", key(&kb.add_subtask)));
    text.push_str(&format!("  {} / {}: Move task to previous/next column\n", key(&kb.move_left), key(&kb.move_right)));
    text.push_str(&format!("  {}: Filter by category, priority, status\n", key(&kb.filter)));
    text.push_str(&format!("  {}: Copy task details\n", key(&kb.copy)));
    text.push_str(&format!("  {}: Toggle list view\n", key(&kb.toggle_list_view)));
    text.push('\n');

    text.push_str("Task form:\n");
    text.push_str(&format!("  {}: Save\n", key(&kb.save)));
    text.push_str("  Tab / Shift+Tab: Next/previous field\n");
    text.push_str("  ← / →: Change category or priority\n");
    text.push_str("  Esc: Cancel\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));
    text.push_str(&format!("  {}: Toggle sidebar\n", key(&kb.toggle_sidebar)));
    text.push_str(&format!("  {}: Cycle theme\n", key(&kb.cycle_theme)));
    text.push_str(&format!("  {}: Sign out\n", key(&kb.sign_out)));
    text.push_str("  Enter / Esc: Dismiss a reminder\n");

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_configured_keys() {
        let mut config = Config::default();
        config.key_bindings.add_subtask = "s".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("s: Add subtask"));
        assert!(text.contains("Cycle theme"));
    }
}
