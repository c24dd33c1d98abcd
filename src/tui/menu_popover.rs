use crate::app::{AppState, MenuPopover};
use crate::menu::MenuItem;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

/// Draw the open action menu next to the list cursor.
pub fn render(f: &mut Frame, list_area: Rect, state: &AppState) {
    let (title, cursor) = match &state.popover {
        MenuPopover::None => return,
        MenuPopover::Run { cursor, .. } => (
            state
                .current_run()
                .map_or_else(|| " Run ".to_string(), |r| format!(" {} ", r.short_id())),
            *cursor,
        ),
        MenuPopover::Bulk { cursor } => (format!(" {} selected ", state.selection.len()), *cursor),
    };
    let items = state.popover_items();
    if items.is_empty() {
        return;
    }

    let tooltip = items.get(cursor).and_then(|i| i.tooltip.clone());
    let content_width = items
        .iter()
        .map(|i| UnicodeWidthStr::width(i.label.as_str()))
        .chain(std::iter::once(UnicodeWidthStr::width(title.as_str())))
        .max()
        .unwrap_or(0);
    let width = (content_width as u16 + 6).min(list_area.width);
    let height = (items.len() as u16 + 2 + u16::from(tooltip.is_some())).min(list_area.height);

    // Below the cursor row when there is room, otherwise above it.
    let cursor_y = list_area.y + (state.cursor as u16).min(list_area.height.saturating_sub(1));
    let y = if cursor_y + 1 + height <= list_area.y + list_area.height {
        cursor_y + 1
    } else {
        cursor_y.saturating_sub(height).max(list_area.y)
    };
    let x = list_area.x + 4.min(list_area.width.saturating_sub(width));
    let area = Rect::new(x, y, width, height);

    f.render_widget(Clear, area);

    let mut lines: Vec<Line> = items
        .iter()
        .enumerate()
        .map(|(i, item)| item_line(item, i == cursor))
        .collect();
    if let Some(tip) = tooltip {
        lines.push(Line::from(Span::styled(
            tip,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn item_line(item: &MenuItem, highlighted: bool) -> Line<'static> {
    let mut style = if item.disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    if highlighted {
        style = style.add_modifier(Modifier::REVERSED);
    }
    let marker = if highlighted { "› " } else { "  " };
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(item.label.clone(), style),
    ])
}
