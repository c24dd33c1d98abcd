//! Background run-list polling with exponential backoff.
//!
//! The interval comes from a `watch::Receiver<u64>` so the event loop can
//! change it (or force an early poll) without restarting the task. After
//! consecutive failures the delay grows as `base × 2^failures`, capped at
//! `MAX_BACKOFF_SECS`, and resets after the next successful poll.

use crate::events::AppEvent;
use crate::traits::OrchestratorApi;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time;

/// 5 minutes. Beyond this the error bar has been visible long enough.
const MAX_BACKOFF_SECS: u64 = 300;

pub struct Poller {
    api: Arc<dyn OrchestratorApi>,
    limit: usize,
    pipeline: Option<String>,
    tx: mpsc::UnboundedSender<AppEvent>,
    interval_rx: watch::Receiver<u64>,
}

/// `min(base_interval * 2^failures, MAX_BACKOFF_SECS)`, never below one second.
pub fn backoff_delay(base_interval: u64, failures: u32) -> u64 {
    let multiplier = 1u64.checked_shl(failures).unwrap_or(u64::MAX);
    base_interval
        .saturating_mul(multiplier)
        .clamp(1, MAX_BACKOFF_SECS)
}

impl Poller {
    pub fn new(
        api: Arc<dyn OrchestratorApi>,
        limit: usize,
        pipeline: Option<String>,
        tx: mpsc::UnboundedSender<AppEvent>,
        interval_rx: watch::Receiver<u64>,
    ) -> Self {
        Self {
            api,
            limit,
            pipeline,
            tx,
            interval_rx,
        }
    }

    pub async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            let base_interval = *self.interval_rx.borrow_and_update();
            let delay = if failures > 0 {
                backoff_delay(base_interval, failures)
            } else {
                base_interval
            };
            tokio::select! {
                () = time::sleep(time::Duration::from_secs(delay)) => {},
                changed = self.interval_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                },
            }

            match self.poll_once().await {
                PollOutcome::Success => failures = 0,
                PollOutcome::Failure => {
                    failures = failures.saturating_add(1);
                    let next_delay = backoff_delay(base_interval, failures);
                    tracing::debug!(failures, next_delay, "poll failed");
                    if self
                        .tx
                        .send(AppEvent::Error(format!("Poll failed, retrying in {next_delay}s")))
                        .is_err()
                    {
                        return;
                    }
                }
                PollOutcome::ChannelClosed => return,
            }
        }
    }

    async fn poll_once(&self) -> PollOutcome {
        match self.api.fetch_runs(self.limit, self.pipeline.as_deref()).await {
            Ok(runs) => {
                if self
                    .tx
                    .send(AppEvent::PollResult { runs, manual: false })
                    .is_err()
                {
                    return PollOutcome::ChannelClosed;
                }
                PollOutcome::Success
            }
            Err(e) => {
                if self.tx.send(AppEvent::Error(e.to_string())).is_err() {
                    return PollOutcome::ChannelClosed;
                }
                PollOutcome::Failure
            }
        }
    }
}

enum PollOutcome {
    Success,
    Failure,
    ChannelClosed,
}

/// Fetch a run's details for its action menu. Not retried here: after a
/// failure, reopening the menu issues a fresh fetch.
pub async fn fetch_run_details(
    api: &dyn OrchestratorApi,
    id: String,
    run_id: &str,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let result = api.fetch_run_details(run_id).await;
    if tx.send(AppEvent::RunDetailsLoaded { id, result }).is_err() {
        tracing::warn!("fetch_run_details: channel closed");
    }
}

/// Workspace and permissions, loaded at startup and after every manual refresh.
pub async fn fetch_context(api: &dyn OrchestratorApi, tx: &mpsc::UnboundedSender<AppEvent>) {
    let event = match api.fetch_workspace().await {
        Ok(ws) => AppEvent::WorkspaceLoaded(ws),
        Err(e) => AppEvent::Error(format!("Failed to load workspace: {e}")),
    };
    if tx.send(event).is_err() {
        tracing::warn!("fetch_context: channel closed");
        return;
    }
    let event = match api.fetch_permissions().await {
        Ok(perms) => AppEvent::PermissionsLoaded(perms),
        Err(e) => AppEvent::Error(format!("Failed to load permissions: {e}")),
    };
    if tx.send(event).is_err() {
        tracing::warn!("fetch_context: channel closed");
    }
}
