use crate::app::ConfigOverlay;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

/// Rows of YAML visible inside the overlay for a terminal of `height` rows.
/// `render` sizes the overlay the same way.
pub fn visible_height(height: u16) -> usize {
    ((height * 8 / 10).max(6).min(height)).saturating_sub(2) as usize
}

pub fn render(f: &mut Frame, overlay: &ConfigOverlay) {
    let area = f.area();

    let width = (area.width * 9 / 10).max(area.width.min(20)).min(area.width);
    let height = (area.height * 8 / 10).max(6).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    f.render_widget(Clear, overlay_area);

    let inner_height = visible_height(area.height);
    let total = overlay.lines.len();
    let scroll_info = if total > inner_height {
        format!(
            " [{}-{}/{}] ",
            overlay.scroll + 1,
            (overlay.scroll + inner_height).min(total),
            total,
        )
    } else {
        String::new()
    };

    let block = Block::default()
        .title(format!(" {} {}", overlay.title, scroll_info))
        .title_bottom(Line::from(" j/k scroll | y copy | q close ").centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));

    let visible_lines: Vec<Line> = overlay
        .lines
        .iter()
        .skip(overlay.scroll)
        .take(inner_height)
        .map(|l| yaml_line(l))
        .collect();

    f.render_widget(Paragraph::new(visible_lines).block(block), overlay_area);
}

fn yaml_line(line: &str) -> Line<'_> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return Line::from(Span::styled(line, Style::default().fg(Color::DarkGray)));
    }
    match line.split_once(':') {
        Some((key, rest)) => Line::from(vec![
            Span::styled(key, Style::default().fg(Color::Cyan)),
            Span::raw(":"),
            Span::styled(rest, Style::default().fg(Color::White)),
        ]),
        None => Line::from(Span::raw(line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_height_matches_overlay_size() {
        assert_eq!(visible_height(50), 38);
        assert_eq!(visible_height(5), 3);
    }

    #[test]
    fn keys_are_split_from_values() {
        let line = yaml_line("  foo: 1");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[0].content, "  foo");
        assert_eq!(line.spans[2].content, " 1");
        assert_eq!(yaml_line("# comment").spans.len(), 1);
    }
}
