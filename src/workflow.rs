//! Termination and deletion confirmation workflows.
//!
//! A workflow is opened with an eligibility map (run id -> `can_terminate`),
//! confirmed by the user, then submitted as one request per run. Requests are
//! independent: a failed run never stops the rest. Nothing is retried; a
//! retry is always a fresh confirm by the user.
//!
//! ```text
//! Open --confirm--> Submitting --all ok------------> Closed
//!   ^                    |------some failed/skipped--> OpenWithErrors --ack--> Closed
//!   |____transport_______|
//! ```

use crate::api::ApiError;
use crate::selection::Eligibility;
use crate::traits::OrchestratorApi;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    Terminate,
    Delete,
}

impl WorkflowKind {
    pub fn verb(self) -> &'static str {
        match self {
            WorkflowKind::Terminate => "Terminate",
            WorkflowKind::Delete => "Delete",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            WorkflowKind::Terminate => "terminated",
            WorkflowKind::Delete => "deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationPolicy {
    /// Ask the run launcher to stop the run; only valid for runs that report
    /// `can_terminate`.
    #[default]
    SafeTerminate,
    /// Mark the run canceled without contacting its process.
    MarkAsCanceledImmediately,
}

impl TerminationPolicy {
    pub fn as_graphql(self) -> &'static str {
        match self {
            TerminationPolicy::SafeTerminate => "SAFE_TERMINATE",
            TerminationPolicy::MarkAsCanceledImmediately => "MARK_AS_CANCELED_IMMEDIATELY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunOpError {
    #[error("Run not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Backend(String),
    #[error("{0}")]
    Transport(String),
}

impl RunOpError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RunOpError::Transport(_))
    }
}

impl From<ApiError> for RunOpError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Transport(msg) => RunOpError::Transport(msg),
            other => RunOpError::Backend(other.to_string()),
        }
    }
}

pub type RunOutcome = Result<(), RunOpError>;

/// Per-run results of one submitted batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: IndexMap<String, RunOutcome>,
    /// Runs that were eligible but not requested (not terminable under the
    /// safe policy).
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn record(&mut self, run_id: &str, outcome: RunOutcome) {
        self.outcomes.insert(run_id.to_string(), outcome);
    }

    pub fn successes(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_ok())
            .map(|(id, _)| id.as_str())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RunOpError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, o)| o.as_ref().err().map(|e| (id.as_str(), e)))
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Every attempted request failed before reaching the server. The batch
    /// as a whole is then reported once instead of per run.
    pub fn is_transport_failure(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .values()
                .all(|o| o.as_ref().is_err_and(RunOpError::is_transport))
    }

    pub fn needs_acknowledgement(&self) -> bool {
        self.failure_count() > 0 || !self.skipped.is_empty()
    }
}

/// What the owner of the workflow should do once a batch finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionEffects {
    pub refetch_runs: bool,
    pub clear_selection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Closed,
    Open,
    Submitting { done: usize, total: usize },
    OpenWithErrors,
}

/// The requests one confirm turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub kind: WorkflowKind,
    pub policy: TerminationPolicy,
    pub requests: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConfirmationWorkflow {
    kind: WorkflowKind,
    state: WorkflowState,
    selected: Eligibility,
    policy: TerminationPolicy,
    report: Option<BatchReport>,
    transport_error: Option<String>,
    on_complete: CompletionEffects,
}

impl ConfirmationWorkflow {
    /// A new workflow starts open, showing `selected` for confirmation.
    pub fn open(kind: WorkflowKind, selected: Eligibility, on_complete: CompletionEffects) -> Self {
        Self {
            kind,
            state: WorkflowState::Open,
            selected,
            policy: TerminationPolicy::default(),
            report: None,
            transport_error: None,
            on_complete,
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn selected(&self) -> &Eligibility {
        &self.selected
    }

    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    pub fn report(&self) -> Option<&BatchReport> {
        self.report.as_ref()
    }

    pub fn transport_error(&self) -> Option<&str> {
        self.transport_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, WorkflowState::Submitting { .. })
    }

    /// Runs in the selection that are still in flight. Deleting them usually
    /// fails; the dialog offers to terminate them instead.
    pub fn in_flight_count(&self) -> usize {
        self.selected.values().filter(|&&can| can).count()
    }

    /// Switch between safe termination and force-marking as canceled. Only
    /// meaningful for termination, and only before submitting.
    pub fn toggle_force(&mut self) {
        if self.kind != WorkflowKind::Terminate || self.state != WorkflowState::Open {
            return;
        }
        self.policy = match self.policy {
            TerminationPolicy::SafeTerminate => TerminationPolicy::MarkAsCanceledImmediately,
            TerminationPolicy::MarkAsCanceledImmediately => TerminationPolicy::SafeTerminate,
        };
    }

    pub fn plan(&self) -> BatchPlan {
        let (requests, skipped) = match (self.kind, self.policy) {
            (WorkflowKind::Terminate, TerminationPolicy::SafeTerminate) => {
                let (can, cannot): (Vec<_>, Vec<_>) =
                    self.selected.iter().partition(|(_, &can)| can);
                (
                    can.into_iter().map(|(id, _)| id.clone()).collect(),
                    cannot.into_iter().map(|(id, _)| id.clone()).collect(),
                )
            }
            (WorkflowKind::Terminate, TerminationPolicy::MarkAsCanceledImmediately)
            | (WorkflowKind::Delete, _) => (self.selected.keys().cloned().collect(), Vec::new()),
        };
        BatchPlan {
            kind: self.kind,
            policy: self.policy,
            requests,
            skipped,
        }
    }

    /// Confirm: move to `Submitting` and hand back the requests to send.
    /// `None` unless the workflow is waiting for confirmation.
    pub fn begin_submit(&mut self) -> Option<BatchPlan> {
        if self.state != WorkflowState::Open {
            return None;
        }
        let plan = self.plan();
        self.transport_error = None;
        self.report = None;
        self.state = WorkflowState::Submitting {
            done: 0,
            total: plan.requests.len(),
        };
        Some(plan)
    }

    pub fn progress(&mut self, done: usize) {
        if let WorkflowState::Submitting { total, .. } = self.state {
            self.state = WorkflowState::Submitting {
                done: done.min(total),
                total,
            };
        }
    }

    /// Record a finished batch. Returns the completion effects to run, or
    /// `None` when the whole batch failed in transport and the workflow went
    /// back to `Open` for the user to retry. A workflow that is not
    /// submitting never confirmed this batch and is left untouched.
    pub fn finish(&mut self, report: BatchReport) -> Option<CompletionEffects> {
        if !self.is_submitting() {
            tracing::warn!(state = ?self.state, "ignoring batch report for a workflow that is not submitting");
            return None;
        }
        if report.is_transport_failure() {
            let msg = report
                .failures()
                .next()
                .map(|(_, e)| e.to_string())
                .unwrap_or_default();
            self.transport_error = Some(msg);
            self.report = None;
            self.state = WorkflowState::Open;
            return None;
        }
        self.state = if report.needs_acknowledgement() {
            WorkflowState::OpenWithErrors
        } else {
            WorkflowState::Closed
        };
        self.report = Some(report);
        Some(self.on_complete)
    }

    pub fn acknowledge(&mut self) {
        if self.state == WorkflowState::OpenWithErrors {
            self.state = WorkflowState::Closed;
        }
    }

    /// Hide the dialog. A batch already submitted keeps running.
    pub fn close(&mut self) {
        self.state = WorkflowState::Closed;
    }
}

/// Send every request of `plan` in order, one at a time, recording each
/// outcome. `on_progress(done, total)` is called after each request.
pub async fn run_batch(
    api: &dyn OrchestratorApi,
    plan: &BatchPlan,
    mut on_progress: impl FnMut(usize, usize) + Send,
) -> BatchReport {
    let total = plan.requests.len();
    let mut report = BatchReport {
        outcomes: IndexMap::with_capacity(total),
        skipped: plan.skipped.clone(),
    };
    for (i, run_id) in plan.requests.iter().enumerate() {
        let outcome = match plan.kind {
            WorkflowKind::Terminate => api.terminate_run(run_id, plan.policy).await,
            WorkflowKind::Delete => api.delete_run(run_id).await,
        };
        if let Err(e) = &outcome {
            tracing::warn!(run_id = %run_id, "{} failed: {e}", plan.kind.verb());
        }
        report.record(run_id, outcome);
        on_progress(i + 1, total);
    }
    tracing::info!(
        "{} batch finished: {} ok, {} failed, {} skipped",
        plan.kind.verb(),
        report.success_count(),
        report.failure_count(),
        report.skipped.len()
    );
    report
}
