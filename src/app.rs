//! Application state: the run list, selection, menus and transient UI.

use crate::input::{DialogMode, InputContext, OverlayMode};
use crate::launch::LaunchBehavior;
use crate::menu::{ActiveDialog, BulkActionsMenu, MenuAction, MenuItem, RunActionsMenu};
use crate::run::{Permissions, RunRef};
use crate::selection::SelectionSet;
use crate::workflow::{BatchReport, CompletionEffects, ConfirmationWorkflow, WorkflowKind, WorkflowState};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;

// ── Shared utility functions ──

/// Format a duration in seconds into a human-readable string (e.g. "2m 5s").
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Elapsed time for a run; still-running runs count up to now.
pub fn compute_duration(started_at: Option<DateTime<Utc>>, ended_at: Option<DateTime<Utc>>) -> String {
    match (started_at, ended_at) {
        (Some(start), Some(end)) => format_duration(end.signed_duration_since(start).num_seconds()),
        (Some(start), None) => format_duration(Utc::now().signed_duration_since(start).num_seconds()),
        _ => String::new(),
    }
}

/// Unicode-width-aware truncation with ellipsis.
pub fn truncate(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for c in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw + 1 > max_width {
            result.push('\u{2026}');
            break;
        }
        result.push(c);
        width += cw;
    }
    result
}

pub const NOTIFICATION_TTL_SECS: u64 = 5;
/// Must match the length of `BRAILLE_FRAMES` in `tui::spinner`.
pub const SPINNER_FRAME_COUNT: usize = 10;
/// Below 60 cols the key hints no longer fit.
pub const NARROW_WIDTH_THRESHOLD: u16 = 60;
pub const ERROR_TTL_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub timestamp: Instant,
}

pub struct ConfigOverlay {
    pub title: String,
    pub yaml: String,
    pub lines: Vec<String>,
    pub scroll: usize,
}

pub struct AlertOverlay {
    pub title: String,
    pub body: String,
}

/// At most one overlay at a time; a new one replaces the previous.
pub enum ActiveOverlay {
    None,
    Config(ConfigOverlay),
    Alert(AlertOverlay),
}

/// Which menu owns a confirmation dialog, so batch events find their way back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DialogOwner {
    Run(String),
    Bulk,
}

/// The open menu popover and its highlighted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuPopover {
    None,
    Run { id: String, cursor: usize },
    Bulk { cursor: usize },
}

/// Immutable configuration set at startup.
pub struct AppConfig {
    pub server_root: String,
    pub limit: usize,
    pub pipeline_filter: Option<String>,
    pub launch_behavior: LaunchBehavior,
    pub version_string: String,
}

pub struct AppState {
    pub config: AppConfig,

    // Run data
    pub runs: Vec<RunRef>,
    pub cursor: usize,
    pub selection: SelectionSet,
    pub permissions: Permissions,
    pub workspace: Workspace,
    /// Moves the cursor to this run once a poll lists it.
    pub focus_run: Option<String>,

    // Menus, keyed by `RunRef::id`; pruned when a run leaves the list.
    pub run_menus: HashMap<String, RunActionsMenu>,
    pub bulk_menu: BulkActionsMenu,
    pub popover: MenuPopover,
    /// The dialog currently on screen. A hidden dialog may still be submitting.
    pub visible_dialog: Option<DialogOwner>,

    // Polling
    pub last_poll: Option<Instant>,
    pub next_poll_in: u64,
    pub poll_interval: u64,

    // Transient UI
    pub notifications: Vec<Notification>,
    pub error: Option<(String, Instant)>,
    pub spinner_frame: usize,
    pub loading_count: u16,
    pub should_quit: bool,
    pub overlay: ActiveOverlay,

    pub desktop_notify: bool,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            runs: Vec::new(),
            cursor: 0,
            selection: SelectionSet::new(),
            permissions: Permissions::default(),
            workspace: Workspace::default(),
            focus_run: None,
            run_menus: HashMap::new(),
            bulk_menu: BulkActionsMenu::new(),
            popover: MenuPopover::None,
            visible_dialog: None,
            last_poll: None,
            next_poll_in: 0,
            poll_interval: 10,
            notifications: Vec::new(),
            error: None,
            spinner_frame: 0,
            loading_count: 0,
            should_quit: false,
            overlay: ActiveOverlay::None,
            desktop_notify: true,
        }
    }

    // --- Run list ---

    /// Replace the run list with a fresh poll, keeping the cursor on the same
    /// run where possible.
    pub fn update_runs(&mut self, new_runs: Vec<RunRef>) {
        let current_id = self.current_run().map(|r| r.id.clone());
        self.runs = new_runs;
        self.selection.reconcile(&self.runs);

        for run in &self.runs {
            if let Some(menu) = self.run_menus.get_mut(&run.id) {
                menu.update_run(run.clone());
            }
        }
        let listed: std::collections::HashSet<&str> = self.runs.iter().map(|r| r.id.as_str()).collect();
        let visible = self.visible_dialog.clone();
        self.run_menus.retain(|id, menu| {
            listed.contains(id.as_str())
                || menu.dialog().is_open()
                || visible == Some(DialogOwner::Run(id.clone()))
        });
        if let MenuPopover::Run { id, .. } = &self.popover {
            if !listed.contains(id.as_str()) {
                self.popover = MenuPopover::None;
            }
        }

        let target = self.focus_run.clone().or(current_id);
        if let Some(idx) = target.and_then(|id| self.runs.iter().position(|r| r.id == id || r.run_id == id)) {
            self.cursor = idx;
            if self
                .focus_run
                .as_ref()
                .is_some_and(|f| self.runs[idx].id == *f || self.runs[idx].run_id == *f)
            {
                self.focus_run = None;
            }
        }
        self.clamp_cursor();
        self.last_poll = Some(Instant::now());
    }

    fn clamp_cursor(&mut self) {
        if self.runs.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.runs.len() {
            self.cursor = self.runs.len() - 1;
        }
    }

    pub fn current_run(&self) -> Option<&RunRef> {
        self.runs.get(self.cursor)
    }

    pub fn move_cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor + 1 < self.runs.len() {
            self.cursor += 1;
        }
    }

    pub fn has_active_runs(&self) -> bool {
        self.runs.iter().any(|r| !r.is_finished())
    }

    // --- Selection ---

    pub fn toggle_current_selection(&mut self) {
        if let Some(run) = self.runs.get(self.cursor).cloned() {
            self.selection.toggle(&run);
        }
    }

    pub fn select_all(&mut self) {
        for run in &self.runs {
            self.selection.insert(run.clone());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- Menus ---

    /// Show the action menu for the run under the cursor. Returns the run id
    /// when its details still need fetching.
    pub fn open_run_menu(&mut self) -> Option<String> {
        let run = self.current_run()?.clone();
        let id = run.id.clone();
        let menu = self
            .run_menus
            .entry(id.clone())
            .or_insert_with(|| RunActionsMenu::new(run));
        let needs_fetch = menu.on_opening();
        self.popover = MenuPopover::Run { id: id.clone(), cursor: 0 };
        needs_fetch.then_some(id)
    }

    pub fn open_bulk_menu(&mut self) -> bool {
        if self.selection.is_empty() {
            self.set_error("Select runs with space first".to_string());
            return false;
        }
        if !BulkActionsMenu::is_available(self.permissions) {
            self.set_error("You do not have permission to terminate or delete runs".to_string());
            return false;
        }
        self.popover = MenuPopover::Bulk { cursor: 0 };
        true
    }

    pub fn has_popover(&self) -> bool {
        self.popover != MenuPopover::None
    }

    pub fn close_popover(&mut self) {
        self.popover = MenuPopover::None;
    }

    pub fn popover_items(&self) -> Vec<MenuItem> {
        match &self.popover {
            MenuPopover::None => Vec::new(),
            MenuPopover::Run { id, .. } => self
                .run_menus
                .get(id)
                .map(|m| m.items(self.permissions))
                .unwrap_or_default(),
            MenuPopover::Bulk { .. } => self.bulk_menu.items(&self.selection, self.permissions),
        }
    }

    pub fn popover_move(&mut self, delta: isize) {
        let len = self.popover_items().len();
        if let MenuPopover::Run { cursor, .. } | MenuPopover::Bulk { cursor } = &mut self.popover {
            if len == 0 {
                *cursor = 0;
            } else {
                *cursor = cursor.saturating_add_signed(delta).min(len - 1);
            }
        }
    }

    /// The highlighted action, if it is enabled.
    pub fn popover_selection(&self) -> Option<MenuAction> {
        let cursor = match &self.popover {
            MenuPopover::None => return None,
            MenuPopover::Run { cursor, .. } | MenuPopover::Bulk { cursor } => *cursor,
        };
        self.popover_items()
            .get(cursor)
            .filter(|item| !item.disabled)
            .map(|item| item.action)
    }

    pub fn popover_owner(&self) -> Option<DialogOwner> {
        match &self.popover {
            MenuPopover::None => None,
            MenuPopover::Run { id, .. } => Some(DialogOwner::Run(id.clone())),
            MenuPopover::Bulk { .. } => Some(DialogOwner::Bulk),
        }
    }

    pub fn popover_menu(&self) -> Option<&RunActionsMenu> {
        match &self.popover {
            MenuPopover::Run { id, .. } => self.run_menus.get(id),
            _ => None,
        }
    }

    // --- Dialogs ---

    pub fn dialog_slot(&self, owner: &DialogOwner) -> Option<&ActiveDialog> {
        match owner {
            DialogOwner::Run(id) => self.run_menus.get(id).map(RunActionsMenu::dialog),
            DialogOwner::Bulk => Some(self.bulk_menu.dialog()),
        }
    }

    pub fn dialog_slot_mut(&mut self, owner: &DialogOwner) -> Option<&mut ActiveDialog> {
        match owner {
            DialogOwner::Run(id) => self.run_menus.get_mut(id).map(RunActionsMenu::dialog_mut),
            DialogOwner::Bulk => Some(self.bulk_menu.dialog_mut()),
        }
    }

    pub fn visible_workflow(&self) -> Option<&ConfirmationWorkflow> {
        let owner = self.visible_dialog.as_ref()?;
        self.dialog_slot(owner)?.workflow()
    }

    pub fn visible_workflow_mut(&mut self) -> Option<&mut ConfirmationWorkflow> {
        let owner = self.visible_dialog.clone()?;
        self.dialog_slot_mut(&owner)?.workflow_mut()
    }

    pub fn has_dialog(&self) -> bool {
        self.visible_workflow().is_some()
    }

    /// Open a confirmation dialog on `owner`'s menu and show it. While that
    /// menu's previous batch is still submitting, its hidden dialog is shown
    /// again instead and `false` is returned.
    pub fn open_dialog(&mut self, owner: DialogOwner, kind: WorkflowKind) -> bool {
        let opened = match &owner {
            DialogOwner::Bulk => self.bulk_menu.open_dialog(kind, &self.selection),
            DialogOwner::Run(id) => match self.run_menus.get_mut(id) {
                Some(menu) => menu.open_dialog(kind),
                None => return false,
            },
        };
        if opened {
            self.visible_dialog = Some(owner);
        } else if self.dialog_slot(&owner).is_some_and(ActiveDialog::is_submitting) {
            self.add_notification("Previous batch is still running".to_string());
            self.visible_dialog = Some(owner);
        }
        opened
    }

    /// Swap the visible deletion dialog for a termination dialog.
    pub fn terminate_instead(&mut self) -> bool {
        let perms = self.permissions;
        match self.visible_dialog.clone() {
            Some(DialogOwner::Run(id)) => self
                .run_menus
                .get_mut(&id)
                .is_some_and(|menu| menu.terminate_instead(perms)),
            Some(DialogOwner::Bulk) => self.bulk_menu.terminate_instead(&self.selection, perms),
            None => false,
        }
    }

    /// The UI state `input::map_key` needs to interpret a key press.
    pub fn input_context(&self) -> InputContext {
        InputContext {
            has_error: self.error.is_some(),
            is_loading: self.is_loading(),
            overlay: match self.overlay {
                ActiveOverlay::None => OverlayMode::None,
                ActiveOverlay::Config(_) => OverlayMode::Config,
                ActiveOverlay::Alert(_) => OverlayMode::Alert,
            },
            dialog: match self.visible_workflow().map(ConfirmationWorkflow::state) {
                None | Some(WorkflowState::Closed) => DialogMode::None,
                Some(WorkflowState::Open) => DialogMode::Confirm,
                Some(WorkflowState::Submitting { .. }) => DialogMode::Submitting,
                Some(WorkflowState::OpenWithErrors) => DialogMode::Results,
            },
            has_popover: self.has_popover(),
        }
    }

    /// Hide the visible dialog. A submitting batch keeps running and its
    /// completion effects still apply.
    pub fn close_dialog(&mut self) {
        let Some(owner) = self.visible_dialog.take() else {
            return;
        };
        if let Some(slot) = self.dialog_slot_mut(&owner) {
            if !slot.workflow().is_some_and(ConfirmationWorkflow::is_submitting) {
                slot.close();
            }
        }
    }

    pub fn acknowledge_dialog(&mut self) {
        if let Some(wf) = self.visible_workflow_mut() {
            wf.acknowledge();
        }
        self.settle_dialogs();
    }

    /// Drop dialogs whose workflow has closed and forget a hidden owner.
    pub fn settle_dialogs(&mut self) {
        if let Some(owner) = self.visible_dialog.clone() {
            if let Some(slot) = self.dialog_slot_mut(&owner) {
                slot.settle();
            }
            if !self.dialog_slot(&owner).is_some_and(ActiveDialog::is_open) {
                self.visible_dialog = None;
            }
        }
    }

    /// Record progress of a running batch.
    pub fn batch_progress(&mut self, owner: &DialogOwner, done: usize) {
        if let Some(wf) = self.dialog_slot_mut(owner).and_then(ActiveDialog::workflow_mut) {
            wf.progress(done);
        }
    }

    /// Feed a finished batch into its workflow and run the completion effects.
    /// Returns `true` when the run list should be refreshed.
    pub fn batch_finished(&mut self, owner: &DialogOwner, report: BatchReport) -> bool {
        let summary = summarize(&report);
        let hidden = self.visible_dialog.as_ref() != Some(owner);
        let submitting = self
            .dialog_slot_mut(owner)
            .and_then(ActiveDialog::workflow_mut)
            .filter(|wf| wf.is_submitting());
        let effects = match submitting {
            Some(wf) => {
                let effects = wf.finish(report);
                let transport_error = wf.transport_error().map(str::to_string);
                if effects.is_some() && hidden && wf.state() == WorkflowState::OpenWithErrors {
                    wf.acknowledge();
                }
                if let Some(slot) = self.dialog_slot_mut(owner) {
                    if hidden && effects.is_none() {
                        slot.close();
                    } else {
                        slot.settle();
                    }
                }
                if effects.is_none() {
                    if let Some(msg) = transport_error {
                        self.set_error(msg);
                    }
                }
                effects
            }
            // The workflow that sent this batch is gone: its run left the
            // list. Effects still apply; any dialog now in the slot is not
            // ours to touch.
            None if report.is_transport_failure() => None,
            None => Some(match owner {
                DialogOwner::Run(_) => RunActionsMenu::completion_effects(),
                DialogOwner::Bulk => BulkActionsMenu::completion_effects(),
            }),
        };
        if self.visible_dialog.as_ref() == Some(owner)
            && !self.dialog_slot(owner).is_some_and(ActiveDialog::is_open)
        {
            self.visible_dialog = None;
        }
        match effects {
            Some(effects) => {
                self.add_notification(summary);
                self.apply_effects(effects)
            }
            None => false,
        }
    }

    /// Returns whether a refresh was requested.
    pub fn apply_effects(&mut self, effects: CompletionEffects) -> bool {
        if effects.clear_selection {
            self.selection.clear();
        }
        effects.refetch_runs
    }

    // --- Overlays ---

    pub fn open_config_overlay(&mut self, title: String, yaml: &str) {
        self.overlay = ActiveOverlay::Config(ConfigOverlay {
            title,
            lines: yaml.lines().map(String::from).collect(),
            yaml: yaml.to_string(),
            scroll: 0,
        });
    }

    pub fn open_alert(&mut self, title: String, body: String) {
        self.overlay = ActiveOverlay::Alert(AlertOverlay { title, body });
    }

    pub fn has_config_overlay(&self) -> bool {
        matches!(self.overlay, ActiveOverlay::Config(_))
    }

    pub fn has_alert(&self) -> bool {
        matches!(self.overlay, ActiveOverlay::Alert(_))
    }

    pub fn close_overlay(&mut self) {
        self.overlay = ActiveOverlay::None;
    }

    pub fn config_overlay_text(&self) -> Option<String> {
        match &self.overlay {
            ActiveOverlay::Config(o) => Some(o.yaml.clone()),
            _ => None,
        }
    }

    pub fn scroll_config_up(&mut self, amount: usize) {
        if let ActiveOverlay::Config(o) = &mut self.overlay {
            o.scroll = o.scroll.saturating_sub(amount);
        }
    }

    pub fn scroll_config_down(&mut self, amount: usize, visible_height: usize) {
        if let ActiveOverlay::Config(o) = &mut self.overlay {
            let max = o.lines.len().saturating_sub(visible_height);
            o.scroll = (o.scroll + amount).min(max);
        }
    }

    pub fn scroll_config_to_top(&mut self) {
        if let ActiveOverlay::Config(o) = &mut self.overlay {
            o.scroll = 0;
        }
    }

    pub fn scroll_config_to_bottom(&mut self, visible_height: usize) {
        if let ActiveOverlay::Config(o) = &mut self.overlay {
            o.scroll = o.lines.len().saturating_sub(visible_height);
        }
    }

    // --- Transient UI ---

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn add_notification(&mut self, message: String) {
        self.notifications.push(Notification {
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn is_loading(&self) -> bool {
        self.loading_count > 0
    }

    pub fn begin_loading(&mut self) {
        self.loading_count = self.loading_count.saturating_add(1);
    }

    pub fn end_loading(&mut self) {
        self.loading_count = self.loading_count.saturating_sub(1);
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn set_error(&mut self, msg: String) {
        self.error = Some((msg, Instant::now()));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn prune_error(&mut self) {
        if let Some((_, ts)) = &self.error {
            if ts.elapsed().as_secs() >= ERROR_TTL_SECS {
                self.error = None;
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }
}

/// One-line summary of a batch for the footer and desktop notifications.
pub fn summarize(report: &BatchReport) -> String {
    let ok = report.success_count();
    let failed = report.failure_count();
    let noun = |n: usize| if n == 1 { "run" } else { "runs" };
    let mut text = format!("{ok} {} succeeded", noun(ok));
    if failed > 0 {
        text.push_str(&format!(", {failed} failed"));
    }
    if !report.skipped.is_empty() {
        text.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunStatus;
    use crate::workflow::{RunOpError, WorkflowKind};
    use pretty_assertions::assert_eq;

    fn run(id: &str, status: RunStatus, can_terminate: bool) -> RunRef {
        RunRef {
            id: id.to_string(),
            run_id: id.to_string(),
            pipeline_name: "etl".to_string(),
            status,
            can_terminate,
            mode: "default".to_string(),
            start_time: None,
            end_time: None,
        }
    }

    fn state() -> AppState {
        AppState::new(AppConfig {
            server_root: "http://localhost:3000".to_string(),
            limit: 25,
            pipeline_filter: None,
            launch_behavior: LaunchBehavior::Open,
            version_string: String::new(),
        })
    }

    fn report(pairs: &[(&str, Result<(), RunOpError>)]) -> BatchReport {
        let mut report = BatchReport::default();
        for (id, outcome) in pairs {
            report.record(id, outcome.clone());
        }
        report
    }

    #[test]
    fn format_duration_ranges() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3720), "1h 2m");
        assert_eq!(format_duration(-3), "0s");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("pipeline", 20), "pipeline");
        assert_eq!(truncate("pipeline", 5), "pipe\u{2026}");
        assert_eq!(truncate("pipeline", 0), "");
    }

    #[test]
    fn cursor_follows_run_across_polls() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true), run("b", RunStatus::Success, false)]);
        s.move_cursor_down();
        assert_eq!(s.current_run().unwrap().id, "b");
        s.update_runs(vec![
            run("new", RunStatus::Queued, true),
            run("a", RunStatus::Started, true),
            run("b", RunStatus::Success, false),
        ]);
        assert_eq!(s.current_run().unwrap().id, "b");
    }

    #[test]
    fn focus_run_applies_once_listed() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Success, false)]);
        s.focus_run = Some("c".to_string());
        s.update_runs(vec![run("a", RunStatus::Success, false)]);
        assert_eq!(s.focus_run.as_deref(), Some("c"));
        s.update_runs(vec![run("a", RunStatus::Success, false), run("c", RunStatus::Queued, true)]);
        assert_eq!(s.current_run().unwrap().id, "c");
        assert_eq!(s.focus_run, None);
    }

    #[test]
    fn reopening_menu_does_not_refetch() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true)]);
        assert_eq!(s.open_run_menu(), Some("a".to_string()));
        s.close_popover();
        assert_eq!(s.open_run_menu(), None);
        assert!(s.has_popover());
    }

    #[test]
    fn menus_pruned_when_run_disappears() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true)]);
        s.open_run_menu();
        s.update_runs(vec![run("b", RunStatus::Started, true)]);
        assert!(!s.run_menus.contains_key("a"));
        assert!(!s.has_popover());
    }

    #[test]
    fn selection_reconciled_with_list() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true), run("b", RunStatus::Started, true)]);
        s.select_all();
        s.update_runs(vec![run("b", RunStatus::Success, false)]);
        assert_eq!(s.selection.len(), 1);
        assert!(s.selection.termination_eligibility().is_empty());
    }

    #[test]
    fn bulk_menu_requires_selection() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true)]);
        assert!(!s.open_bulk_menu());
        assert!(s.error_message().is_some());
        s.toggle_current_selection();
        assert!(s.open_bulk_menu());
        let labels: Vec<String> = s.popover_items().into_iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["Terminate 1 run", "Delete 1 run"]);
    }

    #[test]
    fn popover_skips_disabled_selection() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true)]);
        s.open_run_menu();
        // View Configuration is disabled while loading.
        assert_eq!(s.popover_selection(), None);
        s.popover_move(4);
        assert_eq!(s.popover_selection(), Some(MenuAction::DownloadDebugFile));
        s.popover_move(100);
        assert_eq!(s.popover_selection(), Some(MenuAction::Delete));
    }

    #[test]
    fn bulk_batch_partial_failure_clears_selection() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true), run("b", RunStatus::Started, true)]);
        s.select_all();
        assert!(s.bulk_menu.open_dialog(WorkflowKind::Terminate, &s.selection));
        s.visible_dialog = Some(DialogOwner::Bulk);
        s.visible_workflow_mut().unwrap().begin_submit();

        let refetch = s.batch_finished(
            &DialogOwner::Bulk,
            report(&[("a", Ok(())), ("b", Err(RunOpError::Rejected("no".to_string())))]),
        );
        assert!(refetch);
        assert!(s.selection.is_empty());
        assert_eq!(s.visible_workflow().unwrap().state(), WorkflowState::OpenWithErrors);
        s.acknowledge_dialog();
        assert!(!s.has_dialog());
        assert_eq!(s.visible_dialog, None);
    }

    #[test]
    fn single_run_batch_keeps_selection() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true)]);
        s.toggle_current_selection();
        s.open_run_menu();
        let owner = DialogOwner::Run("a".to_string());
        s.run_menus.get_mut("a").unwrap().open_dialog(WorkflowKind::Terminate);
        s.visible_dialog = Some(owner.clone());
        s.visible_workflow_mut().unwrap().begin_submit();

        assert!(s.batch_finished(&owner, report(&[("a", Ok(()))])));
        assert_eq!(s.selection.len(), 1);
        assert!(!s.has_dialog());
        assert_eq!(s.notifications.last().unwrap().message, "1 run succeeded");
    }

    #[test]
    fn transport_failure_keeps_dialog_open() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Success, false)]);
        s.select_all();
        s.bulk_menu.open_dialog(WorkflowKind::Delete, &s.selection);
        s.visible_dialog = Some(DialogOwner::Bulk);
        s.visible_workflow_mut().unwrap().begin_submit();

        let refetch = s.batch_finished(
            &DialogOwner::Bulk,
            report(&[("a", Err(RunOpError::Transport("refused".to_string())))]),
        );
        assert!(!refetch);
        assert_eq!(s.selection.len(), 1);
        assert_eq!(s.visible_workflow().unwrap().state(), WorkflowState::Open);
        assert_eq!(s.error_message(), Some("refused"));
    }

    #[test]
    fn closing_submitting_dialog_only_hides_it() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Started, true)]);
        s.select_all();
        s.bulk_menu.open_dialog(WorkflowKind::Terminate, &s.selection);
        s.visible_dialog = Some(DialogOwner::Bulk);
        s.visible_workflow_mut().unwrap().begin_submit();
        s.close_dialog();
        assert!(!s.has_dialog());
        assert!(s.bulk_menu.dialog().is_open());

        assert!(s.batch_finished(
            &DialogOwner::Bulk,
            report(&[("a", Err(RunOpError::NotFound("a".to_string())))]),
        ));
        assert!(s.selection.is_empty());
        assert!(!s.bulk_menu.dialog().is_open());
    }

    #[test]
    fn stray_report_leaves_unconfirmed_dialog_alone() {
        let mut s = state();
        s.update_runs(vec![run("a", RunStatus::Success, false)]);
        s.select_all();
        assert!(s.open_dialog(DialogOwner::Bulk, WorkflowKind::Delete));

        s.batch_finished(
            &DialogOwner::Bulk,
            report(&[("a", Err(RunOpError::Rejected("no".to_string())))]),
        );
        let wf = s.visible_workflow().unwrap();
        assert_eq!(wf.kind(), WorkflowKind::Delete);
        assert_eq!(wf.state(), WorkflowState::Open);
        assert!(wf.report().is_none());
        assert_eq!(s.input_context().dialog, DialogMode::Confirm);
    }

    #[test]
    fn summary_text() {
        let mut r = report(&[("a", Ok(())), ("b", Err(RunOpError::Backend("x".to_string())))]);
        r.skipped.push("c".to_string());
        assert_eq!(summarize(&r), "1 run succeeded, 1 failed, 1 skipped");
    }
}
