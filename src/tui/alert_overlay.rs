use crate::app::AlertOverlay;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, overlay: &AlertOverlay) {
    let area = f.area();

    let body_lines: Vec<Line> = overlay
        .body
        .lines()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::White))))
        .collect();

    let width = 60u16.min(area.width);
    let height = (body_lines.len() as u16 + 4).clamp(5, 20).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    f.render_widget(Clear, overlay_area);

    let hints = Line::from(vec![
        Span::styled(
            "enter",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" dismiss ", Style::default().fg(Color::DarkGray)),
    ]);

    let block = Block::default()
        .title(format!(" {} ", overlay.title))
        .title_bottom(hints.centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .style(Style::default().bg(Color::Black));

    let mut lines = vec![Line::from("")];
    lines.extend(body_lines);

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        overlay_area,
    );
}
