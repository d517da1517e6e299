use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use std::cmp;

/// Text buffer behind every input field. Single-line fields simply never get a newline.
#[derive(Debug, Clone)]
pub struct Editor {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize, // Vertical scroll (line offset)
    pub scroll_col: usize,    // Horizontal scroll (column offset)
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            scroll_offset: 0,
            scroll_col: 0,
        }
    }

    pub fn from_string(content: &str) -> Self {
        let lines: Vec<String> = if content.is_empty() {
            vec![String::new()]
        } else {
            content.lines().map(|s| s.to_string()).collect()
        };
        let cursor_line = lines.len().saturating_sub(1);
        let cursor_col = lines.last().map(|l| l.chars().count()).unwrap_or(0);
        Self {
            lines,
            cursor_line,
            cursor_col,
            scroll_offset: 0,
            scroll_col: 0,
        }
    }

    fn ensure_cursor_valid(&mut self) {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        if self.cursor_line >= self.lines.len() {
            self.cursor_line = self.lines.len() - 1;
        }
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines.get(line).map(|l| l.chars().count()).unwrap_or(0)
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        self.ensure_cursor_valid();
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let mut chars: Vec<char> = line.chars().collect();
            let col = cmp::min(self.cursor_col, chars.len());
            chars.insert(col, ch);
            *line = chars.into_iter().collect();
            self.cursor_col = col + 1;
        }
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        self.ensure_cursor_valid();
        let col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
        if col > 0 {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let mut chars: Vec<char> = line.chars().collect();
                chars.remove(col - 1);
                *line = chars.into_iter().collect();
            }
            self.cursor_col = col - 1;
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
            if let Some(prev) = self.lines.get_mut(self.cursor_line) {
                prev.push_str(&current);
            }
        }
    }

    pub fn insert_newline(&mut self) {
        self.ensure_cursor_valid();
        let chars: Vec<char> = self.lines[self.cursor_line].chars().collect();
        let col = cmp::min(self.cursor_col, chars.len());
        let rest: String = chars[col..].iter().collect();
        self.lines[self.cursor_line] = chars[..col].iter().collect();
        self.lines.insert(self.cursor_line + 1, rest);
        self.cursor_line += 1;
        self.cursor_col = 0;
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.line_len(self.cursor_line) {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.line_len(self.cursor_line);
    }

    pub fn move_cursor_word_left(&mut self) {
        let chars: Vec<char> = self.lines.get(self.cursor_line).map(|l| l.chars().collect()).unwrap_or_default();
        let mut pos = cmp::min(self.cursor_col, chars.len());
        while pos > 0 && chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && is_word_char(chars[pos - 1]) {
            pos -= 1;
        }
        self.cursor_col = pos;
    }

    pub fn move_cursor_word_right(&mut self) {
        let chars: Vec<char> = self.lines.get(self.cursor_line).map(|l| l.chars().collect()).unwrap_or_default();
        let mut pos = cmp::min(self.cursor_col, chars.len());
        while pos < chars.len() && is_word_char(chars[pos]) {
            pos += 1;
        }
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        self.cursor_col = pos;
    }

    /// Apply a plain editing key. Returns false if the key is not an editing key.
    /// Enter only inserts a newline when `multi_line` is set.
    pub fn handle_key(&mut self, key_event: KeyEvent, multi_line: bool) -> bool {
        let word = key_event.modifiers.contains(KeyModifiers::CONTROL)
            || key_event.modifiers.contains(KeyModifiers::ALT);
        match key_event.code {
            KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => self.insert_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Enter if multi_line => self.insert_newline(),
            KeyCode::Left if word => self.move_cursor_word_left(),
            KeyCode::Right if word => self.move_cursor_word_right(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Up if multi_line => self.move_cursor_up(),
            KeyCode::Down if multi_line => self.move_cursor_down(),
            KeyCode::Home => self.move_cursor_home(),
            KeyCode::End => self.move_cursor_end(),
            _ => return false,
        }
        true
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    pub fn get_visible_lines(&self, viewport_height: usize, viewport_width: usize) -> (usize, Vec<String>) {
        let start = cmp::min(self.scroll_offset, self.lines.len());
        let end = cmp::min(start + viewport_height, self.lines.len());
        let effective_width = viewport_width.saturating_sub(2);

        let visible = self.lines[start..end]
            .iter()
            .map(|line| line.chars().skip(self.scroll_col).take(effective_width).collect())
            .collect();
        (start, visible)
    }

    pub fn update_scroll(&mut self, viewport_height: usize) {
        if self.cursor_line < self.scroll_offset {
            self.scroll_offset = self.cursor_line;
        } else if viewport_height > 0 && self.cursor_line >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor_line + 1 - viewport_height;
        }
    }

    /// `viewport_width` includes the field borders
    pub fn update_horizontal_scroll(&mut self, viewport_width: usize) {
        let effective_width = viewport_width.saturating_sub(2);
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        } else if effective_width > 0 && self.cursor_col >= self.scroll_col + effective_width {
            self.scroll_col = self.cursor_col + 1 - effective_width;
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn get_cursor_screen_pos(&self, area: Rect, viewport_height: usize) -> Option<(u16, u16)> {
        if self.cursor_line < self.scroll_offset || self.cursor_line >= self.scroll_offset + viewport_height {
            return None;
        }
        let line_y = (self.cursor_line - self.scroll_offset) as u16;
        if line_y >= area.height.saturating_sub(2) {
            return None;
        }

        let col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
        let visible_col = col.checked_sub(self.scroll_col)?;
        if visible_col >= area.width.saturating_sub(2) as usize {
            return None;
        }
        Some((area.x + 1 + visible_col as u16, area.y + 1 + line_y))
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_and_backspace() {
        let mut editor = Editor::new();
        for c in "héllo".chars() {
            editor.insert_char(c);
        }
        editor.delete_char();
        assert_eq!(editor.text(), "héll");
        assert_eq!(editor.cursor_col, 4);
    }

    #[test]
    fn newline_splits_and_backspace_joins() {
        let mut editor = Editor::from_string("abcd");
        editor.cursor_col = 2;
        editor.insert_newline();
        assert_eq!(editor.lines, vec!["ab", "cd"]);
        editor.delete_char();
        assert_eq!(editor.text(), "abcd");
        assert_eq!((editor.cursor_line, editor.cursor_col), (0, 2));
    }

    #[test]
    fn enter_is_ignored_on_single_line_fields() {
        let mut editor = Editor::from_string("title");
        assert!(!editor.handle_key(key(KeyCode::Enter), false));
        assert!(editor.handle_key(key(KeyCode::Enter), true));
        assert_eq!(editor.lines.len(), 2);
    }

    #[test]
    fn word_moves() {
        let mut editor = Editor::from_string("buy more milk");
        editor.move_cursor_word_left();
        assert_eq!(editor.cursor_col, 9);
        editor.move_cursor_home();
        editor.move_cursor_word_right();
        assert_eq!(editor.cursor_col, 4);
    }

    #[test]
    fn horizontal_scroll_follows_cursor() {
        let mut editor = Editor::from_string("0123456789");
        editor.update_horizontal_scroll(6);
        assert_eq!(editor.scroll_col, 7);
        let (_, visible) = editor.get_visible_lines(1, 6);
        assert_eq!(visible, vec!["789"]);
        let pos = editor.get_cursor_screen_pos(Rect::new(0, 0, 6, 3), 1);
        assert_eq!(pos, Some((4, 1)));
    }
}
