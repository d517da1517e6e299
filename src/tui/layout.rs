use ratatui::layout::{Rect, Layout as RatLayout, Direction, Constraint};

/// Screen regions: tabs row, sidebar task list, main pane, filters box, status bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub inner_area: Rect, // Inside the outer border
    pub tabs_area: Rect,
    pub sidebar_area: Rect,
    pub main_area: Rect,
    pub filters_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Inner size needed for sidebar (25) plus a usable main pane, and
    /// tabs + content + filters (3) + status
    pub const MIN_WIDTH: u16 = 38;
    pub const MIN_HEIGHT: u16 = 10;

    const SIDEBAR_MIN: u16 = 25;
    const SIDEBAR_MAX_PERCENT: u16 = 40;
    const MAIN_MIN: u16 = 10;

    /// Whether a terminal of this size can hold the layout, borders included
    pub fn fits(width: u16, height: u16) -> bool {
        width >= Self::MIN_WIDTH + 2 && height >= Self::MIN_HEIGHT + 2
    }

    pub fn calculate(size: Rect, sidebar_width_percent: u16, sidebar_collapsed: bool) -> Self {
        let size = Rect::new(
            size.x,
            size.y,
            size.width.max(Self::MIN_WIDTH + 2),
            size.height.max(Self::MIN_HEIGHT + 2),
        );
        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let sidebar_width = if sidebar_collapsed {
            0
        } else {
            let requested = inner_area.width * sidebar_width_percent / 100;
            let max_width = inner_area.width * Self::SIDEBAR_MAX_PERCENT / 100;
            requested
                .max(Self::SIDEBAR_MIN)
                .min(max_width)
                .min(inner_area.width.saturating_sub(Self::MAIN_MIN))
        };

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Tabs
                Constraint::Min(1),    // Sidebar + main
                Constraint::Length(3), // Filters
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        let horizontal = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(sidebar_width), Constraint::Min(1)])
            .split(vertical[1]);

        Self {
            inner_area,
            tabs_area: vertical[0],
            sidebar_area: horizontal[0],
            main_area: horizontal[1],
            filters_area: vertical[2],
            status_area: vertical[3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_regions_inside_the_border() {
        let layout = Layout::calculate(Rect::new(0, 0, 102, 32), 30, false);
        assert_eq!(layout.inner_area, Rect::new(1, 1, 100, 30));
        assert_eq!(layout.tabs_area.height, 1);
        assert_eq!(layout.sidebar_area.width, 30);
        assert_eq!(layout.main_area.width, 70);
        assert_eq!(layout.filters_area.height, 3);
        assert_eq!(layout.status_area.y, 30);
    }

    #[test]
    fn sidebar_width_is_clamped() {
        let wide = Layout::calculate(Rect::new(0, 0, 102, 32), 90, false);
        assert_eq!(wide.sidebar_area.width, 40);
        let narrow = Layout::calculate(Rect::new(0, 0, 102, 32), 5, false);
        assert_eq!(narrow.sidebar_area.width, 25);
    }

    #[test]
    fn collapsed_sidebar_gives_main_the_row() {
        let layout = Layout::calculate(Rect::new(0, 0, 102, 32), 30, true);
        assert_eq!(layout.sidebar_area.width, 0);
        assert_eq!(layout.main_area.width, 100);
    }

    #[test]
    fn minimum_size() {
        assert!(Layout::fits(40, 12));
        assert!(!Layout::fits(39, 12));
        assert!(!Layout::fits(40, 11));
    }
}
