//! Per-run and bulk action menus.
//!
//! A [`RunActionsMenu`] lives as long as its run is listed, so the expensive
//! config fetch happens at most once however often the menu is reopened.
//! Menus only describe state; the app performs the requests they ask for.

use crate::api::ApiError;
use crate::launch::NavTarget;
use crate::reexecution::{self, ReexecutionError, ReexecutionRequest, ReexecutionStyle};
use crate::run::{Permissions, RepositoryMatch, RunDetails, RunRef, RunStatus};
use crate::selection::{count_label, Eligibility, SelectionSet};
use crate::workflow::{CompletionEffects, ConfirmationWorkflow, WorkflowKind};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogVisibility {
    None,
    Terminate,
    Delete,
}

/// At most one confirmation dialog per menu.
#[derive(Debug, Clone, Default)]
pub enum ActiveDialog {
    #[default]
    None,
    Terminate(ConfirmationWorkflow),
    Delete(ConfirmationWorkflow),
}

impl ActiveDialog {
    fn open(kind: WorkflowKind, selected: Eligibility, effects: CompletionEffects) -> Self {
        let workflow = ConfirmationWorkflow::open(kind, selected, effects);
        match kind {
            WorkflowKind::Terminate => ActiveDialog::Terminate(workflow),
            WorkflowKind::Delete => ActiveDialog::Delete(workflow),
        }
    }

    pub fn visibility(&self) -> DialogVisibility {
        match self {
            ActiveDialog::None => DialogVisibility::None,
            ActiveDialog::Terminate(_) => DialogVisibility::Terminate,
            ActiveDialog::Delete(_) => DialogVisibility::Delete,
        }
    }

    pub fn workflow(&self) -> Option<&ConfirmationWorkflow> {
        match self {
            ActiveDialog::None => None,
            ActiveDialog::Terminate(w) | ActiveDialog::Delete(w) => Some(w),
        }
    }

    pub fn workflow_mut(&mut self) -> Option<&mut ConfirmationWorkflow> {
        match self {
            ActiveDialog::None => None,
            ActiveDialog::Terminate(w) | ActiveDialog::Delete(w) => Some(w),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ActiveDialog::None)
    }

    /// A confirmed batch is still running, possibly with the dialog hidden.
    /// The slot cannot be reused until it finishes.
    pub fn is_submitting(&self) -> bool {
        self.workflow().is_some_and(ConfirmationWorkflow::is_submitting)
    }

    fn replace(&mut self, kind: WorkflowKind, selected: Eligibility, effects: CompletionEffects) -> bool {
        if self.is_submitting() {
            tracing::debug!("dialog slot busy with a running batch");
            return false;
        }
        *self = ActiveDialog::open(kind, selected, effects);
        true
    }

    pub fn close(&mut self) {
        *self = ActiveDialog::None;
    }

    /// Drop the dialog once its workflow reached `Closed`.
    pub fn settle(&mut self) {
        if self
            .workflow()
            .is_some_and(|w| w.state() == crate::workflow::WorkflowState::Closed)
        {
            self.close();
        }
    }

    /// Replace an open, idle deletion dialog with a termination dialog over
    /// `selected`.
    fn switch_to_terminate(&mut self, selected: Eligibility, effects: CompletionEffects) -> bool {
        match self {
            ActiveDialog::Delete(w) if !w.is_submitting() => {
                *self = ActiveDialog::open(WorkflowKind::Terminate, selected, effects);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    ViewConfiguration,
    OpenInLaunchpad,
    Reexecute,
    ReexecuteFromFailure,
    Terminate,
    DownloadDebugFile,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub action: MenuAction,
    pub label: String,
    pub disabled: bool,
    pub tooltip: Option<String>,
}

impl MenuItem {
    fn new(action: MenuAction, label: impl Into<String>) -> Self {
        Self {
            action,
            label: label.into(),
            disabled: false,
            tooltip: None,
        }
    }

    fn disabled_if(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn tooltip(mut self, tooltip: Option<String>) -> Self {
        self.tooltip = tooltip;
        self
    }
}

/// State of the lazy run-details fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLoad {
    NotCalled,
    Loading,
    /// `None` when the run disappeared from the server.
    Loaded(Option<RunDetails>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunActionsMenu {
    run: RunRef,
    config: ConfigLoad,
    repo_match: Option<RepositoryMatch>,
    dialog: ActiveDialog,
}

impl RunActionsMenu {
    const EFFECTS: CompletionEffects = CompletionEffects {
        refetch_runs: true,
        clear_selection: false,
    };

    pub fn new(run: RunRef) -> Self {
        Self {
            run,
            config: ConfigLoad::NotCalled,
            repo_match: None,
            dialog: ActiveDialog::None,
        }
    }

    pub fn run(&self) -> &RunRef {
        &self.run
    }

    /// Keep the listed copy current (status and `can_terminate` change while
    /// the run executes). Loaded details are kept.
    pub fn update_run(&mut self, run: RunRef) {
        self.run = run;
    }

    /// Called every time the menu is shown. Returns `true` when the caller
    /// should fetch the run details now: the first time, and again after a
    /// failed load.
    pub fn on_opening(&mut self) -> bool {
        if matches!(self.config, ConfigLoad::NotCalled | ConfigLoad::Failed(_)) {
            self.config = ConfigLoad::Loading;
            true
        } else {
            false
        }
    }

    pub fn config_loaded(
        &mut self,
        result: Result<Option<RunDetails>, ApiError>,
        workspace: &Workspace,
    ) {
        match result {
            Ok(details) => {
                self.repo_match = details.as_ref().and_then(|d| workspace.match_run(d));
                self.config = ConfigLoad::Loaded(details);
            }
            Err(e) => {
                tracing::warn!(run_id = %self.run.run_id, "failed to load run config: {e}");
                self.repo_match = None;
                self.config = ConfigLoad::Failed(e.to_string());
            }
        }
    }

    /// Recompute the repository match after the workspace reloaded.
    pub fn rematch(&mut self, workspace: &Workspace) {
        if let Some(details) = self.details() {
            self.repo_match = workspace.match_run(details);
        }
    }

    pub fn config_state(&self) -> &ConfigLoad {
        &self.config
    }

    pub fn is_loading(&self) -> bool {
        self.config == ConfigLoad::Loading
    }

    /// The fetch was requested and has completed, successfully or not.
    pub fn info_ready(&self) -> bool {
        matches!(self.config, ConfigLoad::Loaded(_) | ConfigLoad::Failed(_))
    }

    pub fn details(&self) -> Option<&RunDetails> {
        match &self.config {
            ConfigLoad::Loaded(Some(details)) => Some(details),
            _ => None,
        }
    }

    pub fn config_yaml(&self) -> Option<&str> {
        self.details()
            .map(|d| d.run_config_yaml.as_str())
            .filter(|yaml| !yaml.trim().is_empty())
    }

    pub fn repo_match(&self) -> Option<&RepositoryMatch> {
        self.repo_match.as_ref()
    }

    pub fn load_error(&self) -> Option<&str> {
        match &self.config {
            ConfigLoad::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    fn reexecute_blocker(&self, perms: Permissions) -> Option<String> {
        if !perms.can_launch_pipeline_reexecution {
            return Some("You do not have permission to re-execute runs".to_string());
        }
        if !self.info_ready() {
            return None;
        }
        if let Some(msg) = self.load_error() {
            return Some(format!("Could not load run configuration: {msg}"));
        }
        if self.repo_match.is_none() {
            return Some(ReexecutionError::MissingRepositoryMatch.to_string());
        }
        if self.config_yaml().is_none() {
            return Some(ReexecutionError::EmptyConfig.to_string());
        }
        None
    }

    pub fn items(&self, perms: Permissions) -> Vec<MenuItem> {
        let ready = self.info_ready();
        let mut items = vec![
            MenuItem::new(
                MenuAction::ViewConfiguration,
                if self.is_loading() {
                    "Loading Configuration..."
                } else {
                    "View Configuration..."
                },
            )
            .disabled_if(self.config_yaml().is_none()),
            MenuItem::new(MenuAction::OpenInLaunchpad, "Open in Launchpad...").disabled_if(!ready),
        ];

        let blocker = self.reexecute_blocker(perms);
        let reexec_disabled = !ready || blocker.is_some();
        items.push(
            MenuItem::new(MenuAction::Reexecute, "Re-execute")
                .disabled_if(reexec_disabled)
                .tooltip(blocker.clone()),
        );
        if self.run.status == RunStatus::Failure {
            items.push(
                MenuItem::new(MenuAction::ReexecuteFromFailure, "Re-execute from failure")
                    .disabled_if(reexec_disabled)
                    .tooltip(blocker),
            );
        }

        if !self.run.is_finished() && perms.can_terminate_pipeline_execution {
            items.push(MenuItem::new(MenuAction::Terminate, "Terminate"));
        }
        items.push(MenuItem::new(MenuAction::DownloadDebugFile, "Download Debug File"));
        if perms.can_delete_pipeline_run {
            items.push(MenuItem::new(MenuAction::Delete, "Delete"));
        }
        items
    }

    /// Build the launch request for this run's re-execution.
    pub fn reexecute_request(
        &self,
        style: ReexecutionStyle,
    ) -> Result<ReexecutionRequest, ReexecutionError> {
        let details = self.details().ok_or(ReexecutionError::EmptyConfig)?;
        reexecution::build(
            details,
            &details.run_config_yaml,
            self.repo_match.as_ref(),
            style,
        )
    }

    pub fn launchpad_target(&self) -> NavTarget {
        NavTarget::launchpad_from_run(
            &self.run.run_id,
            &self.run.pipeline_name,
            self.repo_match.as_ref(),
        )
    }

    pub fn debug_file_url(&self, server_root: &str) -> String {
        format!(
            "{}/download_debug/{}",
            server_root.trim_end_matches('/'),
            self.run.run_id
        )
    }

    fn own_eligibility(&self) -> Eligibility {
        Eligibility::from([(self.run.id.clone(), self.run.can_terminate)])
    }

    /// Refused while this menu's previous batch is still submitting.
    pub fn open_dialog(&mut self, kind: WorkflowKind) -> bool {
        let selected = self.own_eligibility();
        self.dialog.replace(kind, selected, Self::EFFECTS)
    }

    /// Swap an idle deletion dialog for termination of this run. Only an
    /// unfinished run can be terminated, and only with permission.
    pub fn terminate_instead(&mut self, perms: Permissions) -> bool {
        if !perms.can_terminate_pipeline_execution || self.run.is_finished() {
            return false;
        }
        let selected = self.own_eligibility();
        self.dialog.switch_to_terminate(selected, Self::EFFECTS)
    }

    pub fn dialog(&self) -> &ActiveDialog {
        &self.dialog
    }

    pub fn dialog_mut(&mut self) -> &mut ActiveDialog {
        &mut self.dialog
    }

    pub fn completion_effects() -> CompletionEffects {
        Self::EFFECTS
    }
}

/// Actions over the current bulk selection.
#[derive(Debug, Clone, Default)]
pub struct BulkActionsMenu {
    dialog: ActiveDialog,
}

impl BulkActionsMenu {
    const EFFECTS: CompletionEffects = CompletionEffects {
        refetch_runs: true,
        clear_selection: true,
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// The menu is not offered at all without either permission.
    pub fn is_available(perms: Permissions) -> bool {
        perms.can_terminate_pipeline_execution || perms.can_delete_pipeline_run
    }

    pub fn items(&self, selection: &SelectionSet, perms: Permissions) -> Vec<MenuItem> {
        let mut items = Vec::with_capacity(2);
        if perms.can_terminate_pipeline_execution {
            let n = selection.termination_eligibility().len();
            items.push(
                MenuItem::new(MenuAction::Terminate, count_label("Terminate", n))
                    .disabled_if(n == 0),
            );
        }
        if perms.can_delete_pipeline_run {
            let n = selection.deletion_eligibility().len();
            items.push(
                MenuItem::new(MenuAction::Delete, count_label("Delete", n)).disabled_if(n == 0),
            );
        }
        items
    }

    /// Open a dialog over the current selection. Nothing happens when the
    /// relevant eligibility map is empty or a bulk batch is still running.
    pub fn open_dialog(&mut self, kind: WorkflowKind, selection: &SelectionSet) -> bool {
        let selected = match kind {
            WorkflowKind::Terminate => selection.termination_eligibility(),
            WorkflowKind::Delete => selection.deletion_eligibility(),
        };
        if selected.is_empty() {
            return false;
        }
        self.dialog.replace(kind, selected, Self::EFFECTS)
    }

    /// Hand the in-flight part of the selection to a termination dialog.
    pub fn terminate_instead(&mut self, selection: &SelectionSet, perms: Permissions) -> bool {
        if !perms.can_terminate_pipeline_execution {
            return false;
        }
        let selected = selection.termination_eligibility();
        if selected.is_empty() {
            return false;
        }
        self.dialog.switch_to_terminate(selected, Self::EFFECTS)
    }

    pub fn dialog(&self) -> &ActiveDialog {
        &self.dialog
    }

    pub fn dialog_mut(&mut self) -> &mut ActiveDialog {
        &mut self.dialog
    }

    pub fn completion_effects() -> CompletionEffects {
        Self::EFFECTS
    }
}
