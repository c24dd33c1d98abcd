use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{AppState, NARROW_WIDTH_THRESHOLD};

fn hints(state: &AppState, narrow: bool) -> &'static [(&'static str, &'static str)] {
    if state.has_config_overlay() {
        &[("j/k", "scroll"), ("y", "copy"), ("q", "close")]
    } else if state.has_dialog() || state.has_alert() {
        &[]
    } else if state.has_popover() {
        &[("↑↓/jk", "choose"), ("Enter", "run"), ("Esc", "close")]
    } else if narrow {
        &[
            ("j/k", "nav"),
            ("Enter", "menu"),
            ("spc", "sel"),
            ("M", "bulk"),
            ("q", "quit"),
        ]
    } else {
        &[
            ("↑↓/jk", "navigate"),
            ("Enter/m", "actions"),
            ("space", "select"),
            ("a", "all"),
            ("x", "clear"),
            ("M", "bulk actions"),
            ("o", "open"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    }
}

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;

    let line = if let Some(notif) = state.notifications.last() {
        Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::styled(notif.message.as_str(), Style::default().fg(Color::Yellow)),
        ])
    } else {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints(state, narrow).iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}
