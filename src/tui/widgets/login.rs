use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::style::{Color, Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment, Constraint, Layout, Direction};
use ratatui::text::{Line, Span};
use crate::Config;
use crate::tui::app::{LoginAction, LoginField, LoginState};
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::form::{render_input_field, FieldStyles};
use crate::tui::widgets::popup_area;

/// Sign-in screen shown while there is no session
pub fn render_login(f: &mut Frame, area: Rect, login: &mut LoginState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let base = Style::default().fg(fg_color).bg(bg_color);
    let styles = FieldStyles::from_config(config);

    let popup_area = popup_area(area, 60, 80);
    f.render_widget(Clear, popup_area);
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("Welcome to taskboard")
        .title_alignment(Alignment::Center)
        .style(base);
    let inner = outer.inner(popup_area);
    f.render_widget(outer, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Email
            Constraint::Length(3), // Password
            Constraint::Length(2), // Actions
            Constraint::Min(2),    // Messages
            Constraint::Length(1), // Hint
        ])
        .split(inner);

    let field = login.current_field;
    render_input_field(
        f,
        rows[0],
        &mut login.email,
        "Email",
        styles.pick(field == LoginField::Email),
        field == LoginField::Email,
        false,
    );
    // A reset request only needs the email
    if login.action != LoginAction::Reset {
        render_input_field(
            f,
            rows[1],
            &mut login.password,
            "Password",
            styles.pick(field == LoginField::Password),
            field == LoginField::Password,
            true,
        );
    }

    let mut spans = Vec::new();
    for action in LoginAction::ALL {
        let chosen = action == login.action;
        let style = if chosen && field == LoginField::Action {
            styles.active
        } else if chosen {
            base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            styles.inactive
        };
        spans.push(Span::styled(format!("[ {} ]", action.label()), style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), rows[2]);

    let mut messages = Vec::new();
    if let Some(ref error) = login.error {
        messages.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(ref info) = login.info {
        messages.push(Line::from(Span::styled(info.clone(), Style::default().fg(Color::Green))));
    }
    f.render_widget(Paragraph::new(messages).wrap(Wrap { trim: true }), rows[3]);

    let hint = Line::from(Span::styled(
        "Tab: next field • ←→ choose action • Enter: submit • Esc: quit",
        styles.inactive,
    ));
    f.render_widget(Paragraph::new(hint).alignment(Alignment::Center), rows[4]);
}
