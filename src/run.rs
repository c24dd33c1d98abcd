//! Run identity, status classification, and the per-run details fetched lazily
//! when an action menu opens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    NotStarted,
    Managed,
    Starting,
    Started,
    Success,
    Failure,
    Canceling,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Statuses after which a run can no longer change. Anything else (including
/// statuses this build does not know about) counts as in-flight.
pub const FINISHED_STATUSES: [RunStatus; 3] =
    [RunStatus::Success, RunStatus::Failure, RunStatus::Canceled];

impl RunStatus {
    pub fn is_finished(self) -> bool {
        FINISHED_STATUSES.contains(&self)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::NotStarted => "not started",
            RunStatus::Managed => "managed",
            RunStatus::Starting => "starting",
            RunStatus::Started => "started",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
            RunStatus::Canceling => "canceling",
            RunStatus::Canceled => "canceled",
            RunStatus::Unknown => "unknown",
        }
    }
}

/// A row of the run list. `can_terminate` is the server's hint at list time;
/// the terminate mutation may still be rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRef {
    pub id: String,
    pub run_id: String,
    pub pipeline_name: String,
    pub status: RunStatus,
    pub can_terminate: bool,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
}

fn default_mode() -> String {
    "default".to_string()
}

impl RunRef {
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// First 8 characters of the run id, the way run ids are usually shown.
    pub fn short_id(&self) -> &str {
        self.run_id.get(..8).unwrap_or(&self.run_id)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.and_then(epoch_to_datetime)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end_time.and_then(epoch_to_datetime)
    }
}

fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryOrigin {
    pub repository_name: String,
    pub repository_location_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTag {
    pub key: String,
    pub value: String,
}

/// Everything needed to re-execute or inspect a run. Fetching this is slow on
/// the server side, so it is only requested when a menu opens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    pub id: String,
    pub run_id: String,
    pub pipeline_name: String,
    #[serde(default)]
    pub pipeline_snapshot_id: Option<String>,
    #[serde(default)]
    pub run_config_yaml: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub root_run_id: Option<String>,
    #[serde(default)]
    pub parent_run_id: Option<String>,
    #[serde(default)]
    pub solid_selection: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Vec<RunTag>,
    #[serde(default)]
    pub repository_origin: Option<RepositoryOrigin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    OriginAndSnapshot,
    OriginOnly,
    SnapshotOnly,
    PipelineNameOnly,
}

/// The loaded code location that can still execute a run's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMatch {
    pub repository_name: String,
    pub repository_location_name: String,
    pub is_job: bool,
    pub match_type: MatchType,
}

impl RepositoryMatch {
    /// `repo@location`, the address format used in workspace paths.
    pub fn address(&self) -> String {
        format!("{}@{}", self.repository_name, self.repository_location_name)
    }
}

/// What the current viewer is allowed to do. Servers that do not report a
/// permission are treated as permitting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_launch_pipeline_reexecution: bool,
    pub can_terminate_pipeline_execution: bool,
    pub can_delete_pipeline_run: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_launch_pipeline_reexecution: true,
            can_terminate_pipeline_execution: true,
            can_delete_pipeline_run: true,
        }
    }
}
