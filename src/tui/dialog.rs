//! Termination and deletion confirmation dialogs, including the per-run
//! results shown after a partially failed batch.

use crate::workflow::{ConfirmationWorkflow, TerminationPolicy, WorkflowKind, WorkflowState};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

const MAX_LISTED_RUNS: usize = 8;

pub fn render(f: &mut Frame, workflow: &ConfirmationWorkflow) {
    let area = f.area();
    let lines = body(workflow);

    let width = 64u16.min(area.width);
    let height = (lines.len() as u16 + 2).clamp(7, area.height.max(7)).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let dialog_area = Rect::new(x, y, width, height);

    f.render_widget(Clear, dialog_area);

    let border = match workflow.kind() {
        WorkflowKind::Terminate => Color::Yellow,
        WorkflowKind::Delete => Color::Red,
    };
    let block = Block::default()
        .title(format!(" {} ", title(workflow)))
        .title_bottom(hints(workflow).centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(Color::Black));

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        dialog_area,
    );
}

fn title(workflow: &ConfirmationWorkflow) -> String {
    let n = workflow.selected().len();
    let noun = if n == 1 { "run" } else { "runs" };
    match workflow.kind() {
        WorkflowKind::Terminate => format!("Terminate {n} {noun}"),
        WorkflowKind::Delete => format!("Delete {n} {noun}"),
    }
}

fn key(k: &'static str, color: Color) -> Span<'static> {
    Span::styled(k, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn desc(d: &'static str) -> Span<'static> {
    Span::styled(d, Style::default().fg(Color::DarkGray))
}

fn hints(workflow: &ConfirmationWorkflow) -> Line<'static> {
    match workflow.state() {
        WorkflowState::Open => {
            let mut spans = vec![key("y", Color::Green), desc(" confirm  "), key("n", Color::Red), desc(" cancel ")];
            match workflow.kind() {
                WorkflowKind::Terminate => {
                    spans.push(desc(" "));
                    spans.push(key("f", Color::Yellow));
                    spans.push(desc(" force "));
                }
                WorkflowKind::Delete if workflow.in_flight_count() > 0 => {
                    spans.push(desc(" "));
                    spans.push(key("t", Color::Yellow));
                    spans.push(desc(" terminate instead "));
                }
                WorkflowKind::Delete => {}
            }
            Line::from(spans)
        }
        WorkflowState::Submitting { .. } => Line::from(vec![key("esc", Color::Cyan), desc(" hide ")]),
        WorkflowState::OpenWithErrors | WorkflowState::Closed => {
            Line::from(vec![key("enter", Color::Cyan), desc(" close ")])
        }
    }
}

/// Lines inside the dialog for the workflow's current state.
pub fn body(workflow: &ConfirmationWorkflow) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    match workflow.state() {
        WorkflowState::Open | WorkflowState::Closed => {
            if let Some(err) = workflow.transport_error() {
                lines.push(Line::from(Span::styled(
                    format!("Request failed: {err}"),
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::from(""));
            }
            lines.extend(confirmation_text(workflow));
        }
        WorkflowState::Submitting { done, total } => {
            let verb = match workflow.kind() {
                WorkflowKind::Terminate => "Terminating",
                WorkflowKind::Delete => "Deleting",
            };
            lines.push(Line::from(format!("{verb} runs... {done}/{total}")));
            lines.push(progress_bar(done, total, 40));
        }
        WorkflowState::OpenWithErrors => lines.extend(results(workflow)),
    }
    lines
}

fn confirmation_text(workflow: &ConfirmationWorkflow) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let plan = workflow.plan();
    match workflow.kind() {
        WorkflowKind::Terminate => {
            let text = match workflow.policy() {
                TerminationPolicy::SafeTerminate => "Runs will be sent a termination request.",
                TerminationPolicy::MarkAsCanceledImmediately => {
                    "Runs will be marked canceled immediately, without waiting for their processes."
                }
            };
            lines.push(Line::from(text));
            if !plan.skipped.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!(
                        "{} of these cannot be terminated safely and will be skipped. Press f to force.",
                        plan.skipped.len()
                    ),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }
        WorkflowKind::Delete => {
            lines.push(Line::from("Deleted runs and their logs cannot be recovered."));
            let in_flight = workflow.in_flight_count();
            if in_flight > 0 {
                lines.push(Line::from(Span::styled(
                    format!("{in_flight} still running. Consider terminating instead."),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }
    }
    lines.push(Line::from(""));
    let ids: Vec<&String> = workflow.selected().keys().collect();
    for id in ids.iter().take(MAX_LISTED_RUNS) {
        lines.push(Line::from(Span::styled(format!("  {id}"), Style::default().fg(Color::DarkGray))));
    }
    if ids.len() > MAX_LISTED_RUNS {
        lines.push(Line::from(Span::styled(
            format!("  ...and {} more", ids.len() - MAX_LISTED_RUNS),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn results(workflow: &ConfirmationWorkflow) -> Vec<Line<'static>> {
    let Some(report) = workflow.report() else {
        return Vec::new();
    };
    let mut lines = vec![Line::from(format!(
        "{} {} successfully.",
        report.success_count(),
        workflow.kind().past_tense()
    ))];
    let failed = report.failure_count();
    if failed > 0 {
        lines.push(Line::from(Span::styled(
            format!("{failed} could not be {}:", workflow.kind().past_tense()),
            Style::default().fg(Color::Red),
        )));
        for (id, err) in report.failures().take(MAX_LISTED_RUNS) {
            lines.push(Line::from(vec![
                Span::styled(format!("  {id}: "), Style::default().fg(Color::DarkGray)),
                Span::styled(err.to_string(), Style::default().fg(Color::Red)),
            ]));
        }
    }
    if !report.skipped.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} skipped (not terminable safely)", report.skipped.len()),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines
}

fn progress_bar(done: usize, total: usize, width: usize) -> Line<'static> {
    let filled = if total == 0 { width } else { done * width / total };
    Line::from(vec![
        Span::styled("█".repeat(filled), Style::default().fg(Color::Green)),
        Span::styled("░".repeat(width - filled), Style::default().fg(Color::DarkGray)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Eligibility;
    use crate::workflow::{BatchReport, CompletionEffects, RunOpError};

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn workflow(kind: WorkflowKind, pairs: &[(&str, bool)]) -> ConfirmationWorkflow {
        let selected: Eligibility = pairs.iter().map(|(id, c)| ((*id).to_string(), *c)).collect();
        ConfirmationWorkflow::open(kind, selected, CompletionEffects::default())
    }

    #[test]
    fn terminate_warns_about_skipped_runs() {
        let wf = workflow(WorkflowKind::Terminate, &[("a", true), ("b", false)]);
        let t = text(&body(&wf));
        assert!(t.contains("1 of these cannot be terminated safely"));
        assert!(t.contains("  a"));
        assert_eq!(title(&wf), "Terminate 2 runs");
    }

    #[test]
    fn delete_suggests_terminating_in_flight_runs() {
        let wf = workflow(WorkflowKind::Delete, &[("a", true)]);
        assert!(text(&body(&wf)).contains("1 still running"));
        let hint = hints(&wf);
        assert!(hint.spans.iter().any(|s| s.content == " terminate instead "));
    }

    #[test]
    fn results_list_each_failure() {
        let mut wf = workflow(WorkflowKind::Delete, &[("a", false), ("b", false)]);
        wf.begin_submit();
        let mut report = BatchReport::default();
        report.record("a", Ok(()));
        report.record("b", Err(RunOpError::NotFound("b".to_string())));
        wf.finish(report);
        let t = text(&body(&wf));
        assert!(t.contains("1 deleted successfully."));
        assert!(t.contains("1 could not be deleted:"));
        assert!(t.contains("b: Run not found: b"));
    }

    #[test]
    fn progress_while_submitting() {
        let mut wf = workflow(WorkflowKind::Terminate, &[("a", true), ("b", true)]);
        wf.begin_submit();
        wf.progress(1);
        assert!(text(&body(&wf)).contains("Terminating runs... 1/2"));
    }

    #[test]
    fn progress_bar_bounds() {
        let width = |l: Line| l.spans.iter().map(|s| s.content.chars().count()).sum::<usize>();
        assert_eq!(width(progress_bar(0, 0, 10)), 10);
        assert_eq!(width(progress_bar(3, 7, 10)), 10);
    }
}
