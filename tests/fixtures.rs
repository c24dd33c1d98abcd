#![allow(dead_code)]

use async_trait::async_trait;
use runw::api::ApiError;
use runw::app::{AppConfig, AppState};
use runw::launch::{LaunchBehavior, LaunchOutcome};
use runw::reexecution::ReexecutionRequest;
use runw::run::{Permissions, RepositoryOrigin, RunDetails, RunRef, RunStatus, RunTag};
use runw::traits::OrchestratorApi;
use runw::workflow::{RunOpError, TerminationPolicy};
use runw::workspace::{PipelineEntry, Repository, RepositoryLocation, Workspace};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn run(id: &str, status: RunStatus, can_terminate: bool) -> RunRef {
    RunRef {
        id: id.to_string(),
        run_id: id.to_string(),
        pipeline_name: "etl".to_string(),
        status,
        can_terminate,
        mode: "default".to_string(),
        start_time: Some(1_700_000_000.0),
        end_time: status.is_finished().then_some(1_700_000_090.0),
    }
}

pub fn finished_run(id: &str) -> RunRef {
    run(id, RunStatus::Success, false)
}

pub fn started_run(id: &str) -> RunRef {
    run(id, RunStatus::Started, true)
}

pub fn details(run_id: &str, config_yaml: &str) -> RunDetails {
    RunDetails {
        id: run_id.to_string(),
        run_id: run_id.to_string(),
        pipeline_name: "etl".to_string(),
        pipeline_snapshot_id: Some("snap-1".to_string()),
        run_config_yaml: config_yaml.to_string(),
        mode: "default".to_string(),
        root_run_id: None,
        parent_run_id: None,
        solid_selection: None,
        tags: vec![
            RunTag {
                key: "team".to_string(),
                value: "data".to_string(),
            },
            RunTag {
                key: "dagster/schedule_name".to_string(),
                value: "nightly".to_string(),
            },
        ],
        repository_origin: Some(RepositoryOrigin {
            repository_name: "repo".to_string(),
            repository_location_name: "loc".to_string(),
        }),
    }
}

/// One location `loc` with repository `repo` defining job `etl`.
pub fn workspace() -> Workspace {
    Workspace {
        locations: vec![RepositoryLocation {
            name: "loc".to_string(),
            repositories: vec![Repository {
                name: "repo".to_string(),
                pipelines: vec![PipelineEntry {
                    name: "etl".to_string(),
                    is_job: true,
                    pipeline_snapshot_id: Some("snap-1".to_string()),
                }],
            }],
        }],
    }
}

pub fn config() -> AppConfig {
    AppConfig {
        server_root: "http://localhost:3000".to_string(),
        limit: 25,
        pipeline_filter: None,
        launch_behavior: LaunchBehavior::Open,
        version_string: "runw v0.0.0+0".to_string(),
    }
}

pub fn make_state_with_runs(runs: Vec<RunRef>) -> AppState {
    let mut state = AppState::new(config());
    state.workspace = workspace();
    state.update_runs(runs);
    state
}

/// In-memory server. Runs without a scripted failure succeed; every call is
/// recorded.
#[derive(Default)]
pub struct FakeApi {
    pub runs: Vec<RunRef>,
    pub details: HashMap<String, RunDetails>,
    pub failures: HashMap<String, RunOpError>,
    pub launch_outcome: Option<LaunchOutcome>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_runs(runs: Vec<RunRef>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    pub fn fail(mut self, run_id: &str, err: RunOpError) -> Self {
        self.failures.insert(run_id.to_string(), err);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome_for(&self, run_id: &str) -> Result<(), RunOpError> {
        match self.failures.get(run_id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrchestratorApi for FakeApi {
    async fn fetch_runs(&self, limit: usize, pipeline: Option<&str>) -> Result<Vec<RunRef>, ApiError> {
        self.record(format!("runs:{limit}"));
        Ok(self
            .runs
            .iter()
            .filter(|r| pipeline.is_none_or(|p| r.pipeline_name == p))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_run_details(&self, run_id: &str) -> Result<Option<RunDetails>, ApiError> {
        self.record(format!("details:{run_id}"));
        Ok(self.details.get(run_id).cloned())
    }

    async fn fetch_workspace(&self) -> Result<Workspace, ApiError> {
        Ok(workspace())
    }

    async fn fetch_permissions(&self) -> Result<Permissions, ApiError> {
        Ok(Permissions::default())
    }

    async fn launch_reexecution(&self, request: &ReexecutionRequest) -> Result<LaunchOutcome, ApiError> {
        self.record(format!("launch:{}", request.parent_run_id));
        Ok(self.launch_outcome.clone().unwrap_or(LaunchOutcome::Success {
            run_id: "new-run".to_string(),
        }))
    }

    async fn terminate_run(&self, run_id: &str, policy: TerminationPolicy) -> Result<(), RunOpError> {
        self.record(format!("terminate:{run_id}:{}", policy.as_graphql()));
        self.outcome_for(run_id)
    }

    async fn delete_run(&self, run_id: &str) -> Result<(), RunOpError> {
        self.record(format!("delete:{run_id}"));
        self.outcome_for(run_id)
    }
}
