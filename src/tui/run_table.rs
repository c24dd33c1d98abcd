use crate::app::{compute_duration, truncate, AppState, NARROW_WIDTH_THRESHOLD};
use crate::run::{RunRef, RunStatus};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;
    let inner_width = area.width as usize;

    if state.runs.is_empty() && !state.is_loading() {
        let msg = match &state.config.pipeline_filter {
            Some(p) => format!("No runs for {p}"),
            None => "No runs found".to_string(),
        };
        let para = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::NONE));
        f.render_widget(para, area);
        return;
    }

    let visible_height = area.height as usize;
    let scroll_offset = (state.cursor + 1).saturating_sub(visible_height);

    let lines: Vec<Line> = state
        .runs
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height)
        .map(|(i, run)| {
            render_run_line(
                run,
                i == state.cursor,
                state.selection.contains(&run.id),
                narrow,
                inner_width,
            )
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::NONE)),
        area,
    );
}

pub fn status_icon(status: RunStatus) -> (&'static str, Color) {
    match status {
        RunStatus::Success => ("✓", Color::Green),
        RunStatus::Failure => ("✗", Color::Red),
        RunStatus::Canceled => ("⊘", Color::Yellow),
        RunStatus::Canceling => ("⊘", Color::Magenta),
        RunStatus::Started | RunStatus::Starting => ("⟳", Color::Yellow),
        RunStatus::Queued | RunStatus::NotStarted | RunStatus::Managed | RunStatus::Unknown => {
            ("·", Color::DarkGray)
        }
    }
}

fn render_run_line(
    run: &RunRef,
    is_cursor: bool,
    is_selected: bool,
    narrow: bool,
    max_width: usize,
) -> Line<'static> {
    let (icon, icon_color) = status_icon(run.status);
    let check = if is_selected { "[x]" } else { "[ ]" };
    let id = run.short_id().to_string();
    let status = run.status.label();
    let duration = compute_duration(run.started_at(), run.ended_at());

    let prefix_width = check.len() + 1 + UnicodeWidthStr::width(icon) + 1 + id.len() + 1;
    let suffix_width = if narrow {
        0
    } else {
        status.len() + 1 + duration.len() + 1
    };
    let name = truncate(
        &run.pipeline_name,
        max_width.saturating_sub(prefix_width + suffix_width + 1),
    );

    let name_style = if is_cursor {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let check_style = if is_selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![
        Span::styled(format!("{check} "), check_style),
        Span::styled(format!("{icon} "), Style::default().fg(icon_color)),
        Span::styled(format!("{id} "), Style::default().fg(Color::DarkGray)),
        Span::styled(name, name_style),
    ];
    if !narrow {
        spans.push(Span::styled(format!(" {status}"), Style::default().fg(icon_color)));
        if !duration.is_empty() {
            spans.push(Span::styled(
                format!(" {duration}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(status: RunStatus) -> RunRef {
        RunRef {
            id: "0123456789abcdef".to_string(),
            run_id: "0123456789abcdef".to_string(),
            pipeline_name: "a_rather_long_pipeline_name_for_testing".to_string(),
            status,
            can_terminate: false,
            mode: "default".to_string(),
            start_time: Some(1_700_000_000.0),
            end_time: Some(1_700_000_065.0),
        }
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn selected_row_shows_checkbox() {
        let line = render_run_line(&run(RunStatus::Success), false, true, false, 120);
        let t = text(&line);
        assert!(t.starts_with("[x] ✓ "));
        assert!(t.contains("success"));
        assert!(t.contains("1m 5s"));
    }

    #[test]
    fn narrow_rows_drop_status() {
        let line = render_run_line(&run(RunStatus::Failure), true, false, true, 40);
        let t = text(&line);
        assert!(!t.contains("failure"));
        assert!(UnicodeWidthStr::width(t.as_str()) <= 40);
    }

    #[test]
    fn every_status_has_an_icon() {
        for status in [RunStatus::Queued, RunStatus::Canceling, RunStatus::Unknown] {
            assert!(!status_icon(status).0.is_empty());
        }
    }
}
