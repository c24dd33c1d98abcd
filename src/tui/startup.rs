//! Animated startup screen.
//!
//! Each phase future is raced against an 80ms ticker with `tokio::select!`, so
//! the spinner keeps turning while the server is slow to answer.

use crate::run::{Permissions, RunRef};
use crate::traits::OrchestratorApi;
use crate::tui::spinner;
use crate::workspace::Workspace;
use color_eyre::eyre::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use std::future::Future;
use std::time::Duration;

const RUNW_ART: &[&str] = &[
    r"  ____ __ __ ____  __    __ ",
    r" |  _ \  |  |    \|  |/\|  |",
    r" | |_) | |  |  |  |  |  |  |",
    r" |  _ <| |__|  |  |        |",
    r" |_| \_\_____|_|__|__/\/\__|",
];

/// Blue to teal, one stop per art line.
fn gradient_color(line_idx: usize, total_lines: usize) -> Color {
    if total_lines <= 1 {
        return Color::Rgb(70, 110, 255);
    }
    let t = line_idx as f64 / (total_lines - 1) as f64;
    Color::Rgb(
        (70.0 - 40.0 * t) as u8,
        (110.0 + 110.0 * t) as u8,
        (255.0 - 55.0 * t) as u8,
    )
}

#[derive(Clone)]
enum PhaseStatus {
    InProgress,
    Done,
    Failed(String),
}

#[derive(Clone)]
struct StartupPhase {
    label: String,
    detail: Option<String>,
    status: PhaseStatus,
}

pub struct StartupResult {
    pub workspace: Workspace,
    pub permissions: Permissions,
    pub runs: Vec<RunRef>,
}

fn phase_line(phase: &StartupPhase, frame: usize) -> Line<'_> {
    let (icon, icon_style) = match &phase.status {
        PhaseStatus::InProgress => (
            spinner::frame(frame).to_string(),
            Style::default().fg(Color::Yellow),
        ),
        PhaseStatus::Done => ("\u{2713}".to_string(), Style::default().fg(Color::Green)),
        PhaseStatus::Failed(_) => ("\u{2717}".to_string(), Style::default().fg(Color::Red)),
    };

    let mut spans = vec![
        Span::styled(format!("  {icon} "), icon_style),
        Span::styled(phase.label.as_str(), Style::default().fg(Color::White)),
    ];
    if let Some(detail) = &phase.detail {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(detail.as_str(), Style::default().fg(Color::DarkGray)));
    }
    if let PhaseStatus::Failed(msg) = &phase.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(msg.as_str(), Style::default().fg(Color::Red)));
    }
    Line::from(spans)
}

fn render_startup<B: Backend>(terminal: &mut Terminal<B>, phases: &[StartupPhase], frame: usize) {
    if let Err(e) = terminal.draw(|f| {
        let area = f.area();
        let total_lines = RUNW_ART.len() as u16 + 1 + phases.len() as u16;
        let top_offset = (area.height.saturating_sub(total_lines) / 2).saturating_sub(2);
        let vertical = Layout::vertical([
            Constraint::Length(top_offset),
            Constraint::Length(total_lines),
            Constraint::Min(0),
        ])
        .split(area);

        let mut lines: Vec<Line> = RUNW_ART
            .iter()
            .enumerate()
            .map(|(i, line)| {
                Line::from(Span::styled(
                    *line,
                    Style::default().fg(gradient_color(i, RUNW_ART.len())),
                ))
            })
            .collect();
        lines.push(Line::from(""));
        lines.extend(phases.iter().map(|p| phase_line(p, frame)));

        f.render_widget(Paragraph::new(lines), vertical[1]);
    }) {
        tracing::warn!("startup render failed: {e}");
    }
}

async fn run_phase<B, F, T, E>(
    terminal: &mut Terminal<B>,
    phases: &mut Vec<StartupPhase>,
    label: String,
    fut: F,
) -> Result<T>
where
    B: Backend,
    F: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    phases.push(StartupPhase {
        label,
        detail: None,
        status: PhaseStatus::InProgress,
    });
    render_startup(terminal, phases, 0);

    let mut ticker = tokio::time::interval(Duration::from_millis(80));
    let mut frame = 0usize;
    tokio::pin!(fut);

    loop {
        tokio::select! {
            result = &mut fut => {
                let idx = phases.len() - 1;
                match &result {
                    Ok(_) => phases[idx].status = PhaseStatus::Done,
                    Err(e) => phases[idx].status = PhaseStatus::Failed(e.to_string()),
                }
                render_startup(terminal, phases, frame);
                return result.map_err(Into::into);
            }
            _ = ticker.tick() => {
                frame += 1;
                render_startup(terminal, phases, frame);
            }
        }
    }
}

/// Connect, then load permissions and the first page of runs. Any failure
/// aborts startup with the phase marked as failed.
pub async fn run_startup<B: Backend>(
    terminal: &mut Terminal<B>,
    api: &dyn OrchestratorApi,
    server_root: &str,
    limit: usize,
    pipeline: Option<&str>,
) -> Result<StartupResult> {
    let mut phases: Vec<StartupPhase> = Vec::new();

    let workspace = run_phase(
        terminal,
        &mut phases,
        format!("Connecting to {server_root}"),
        api.fetch_workspace(),
    )
    .await?;
    let idx = phases.len() - 1;
    let locations = workspace.locations.len();
    phases[idx].detail = Some(format!(
        "{locations} code location{}",
        if locations == 1 { "" } else { "s" }
    ));
    render_startup(terminal, &phases, 0);

    let permissions = run_phase(
        terminal,
        &mut phases,
        "Loading permissions".to_string(),
        api.fetch_permissions(),
    )
    .await?;
    let idx = phases.len() - 1;
    if !permissions.can_terminate_pipeline_execution || !permissions.can_delete_pipeline_run {
        phases[idx].detail = Some("(restricted)".to_string());
        render_startup(terminal, &phases, 0);
    }

    let label = match pipeline {
        Some(p) => format!("Fetching {p} runs"),
        None => "Fetching runs".to_string(),
    };
    let runs = run_phase(terminal, &mut phases, label, api.fetch_runs(limit, pipeline)).await?;
    let idx = phases.len() - 1;
    phases[idx].detail = Some(format!("{} runs", runs.len()));
    render_startup(terminal, &phases, 0);

    Ok(StartupResult {
        workspace,
        permissions,
        runs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_endpoints() {
        assert_eq!(gradient_color(0, 5), Color::Rgb(70, 110, 255));
        assert_eq!(gradient_color(4, 5), Color::Rgb(30, 220, 200));
        assert_eq!(gradient_color(0, 1), Color::Rgb(70, 110, 255));
    }

    #[test]
    fn failed_phase_shows_message() {
        let phase = StartupPhase {
            label: "Loading permissions".to_string(),
            detail: None,
            status: PhaseStatus::Failed("HTTP 500".to_string()),
        };
        let text: String = phase_line(&phase, 0)
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert!(text.contains("\u{2717} Loading permissions"));
        assert!(text.ends_with("HTTP 500"));
    }
}
