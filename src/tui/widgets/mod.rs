pub mod board;
pub mod color;
pub mod confirm_delete;
pub mod editor;
pub mod filter_modal;
pub mod filters_box;
pub mod form;
pub mod help;
pub mod item_view;
pub mod login;
pub mod notice;
pub mod prompt;
pub mod stats_view;
pub mod status_bar;
pub mod tabs;
pub mod task_list;

use ratatui::layout::{Constraint, Flex, Layout, Rect};

/// Centered rect taking the given percentage of `area`
/// Based on ratatui popup example: https://ratatui.rs/examples/apps/popup/
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_is_centered() {
        let area = popup_area(Rect::new(0, 0, 100, 40), 50, 50);
        assert_eq!(area, Rect::new(25, 10, 50, 20));
    }
}
