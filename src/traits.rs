use crate::api::ApiError;
use crate::launch::LaunchOutcome;
use crate::reexecution::ReexecutionRequest;
use crate::run::{Permissions, RunDetails, RunRef};
use crate::workflow::{RunOpError, TerminationPolicy};
use crate::workspace::Workspace;
use async_trait::async_trait;

#[async_trait]
pub trait OrchestratorApi: Send + Sync {
    async fn fetch_runs(&self, limit: usize, pipeline: Option<&str>) -> Result<Vec<RunRef>, ApiError>;
    /// `Ok(None)` when the run no longer exists.
    async fn fetch_run_details(&self, run_id: &str) -> Result<Option<RunDetails>, ApiError>;
    async fn fetch_workspace(&self) -> Result<Workspace, ApiError>;
    async fn fetch_permissions(&self) -> Result<Permissions, ApiError>;
    async fn launch_reexecution(&self, request: &ReexecutionRequest) -> Result<LaunchOutcome, ApiError>;
    async fn terminate_run(&self, run_id: &str, policy: TerminationPolicy) -> Result<(), RunOpError>;
    async fn delete_run(&self, run_id: &str) -> Result<(), RunOpError>;
}
