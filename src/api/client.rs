use super::{parser, queries, ApiError};
use crate::launch::LaunchOutcome;
use crate::reexecution::ReexecutionRequest;
use crate::run::{Permissions, RunDetails, RunRef};
use crate::traits::OrchestratorApi;
use crate::workflow::{RunOpError, TerminationPolicy};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GraphQlClient {
    http: reqwest::Client,
    server_root: String,
}

impl GraphQlClient {
    pub fn new(server_root: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            server_root: server_root.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_root(&self) -> &str {
        &self.server_root
    }

    fn endpoint(&self) -> String {
        format!("{}/graphql", self.server_root)
    }

    /// POST one GraphQL document and return its `data` member.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let operation = query
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.split('(').next())
            .unwrap_or("anonymous");
        tracing::debug!(operation, "graphql request");

        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ApiError::Transport(format!(
                        "Cannot reach {}. Is the server running?",
                        self.server_root
                    ))
                } else if e.is_timeout() {
                    ApiError::Transport(format!(
                        "Request timed out after {}s",
                        REQUEST_TIMEOUT.as_secs()
                    ))
                } else {
                    ApiError::Transport(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            return Err(ApiError::Transport(if body.is_empty() {
                format!("Server returned HTTP {status}")
            } else {
                format!("Server returned HTTP {status}: {body}")
            }));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("invalid JSON body: {e}")))?;
        parser::extract_data(body)
    }
}

#[async_trait]
impl OrchestratorApi for GraphQlClient {
    async fn fetch_runs(&self, limit: usize, pipeline: Option<&str>) -> Result<Vec<RunRef>, ApiError> {
        let filter = pipeline.map(|p| json!({ "pipelineName": p }));
        let data = self
            .execute(queries::RUNS_QUERY, json!({ "limit": limit, "filter": filter }))
            .await?;
        parser::parse_runs(&data)
    }

    async fn fetch_run_details(&self, run_id: &str) -> Result<Option<RunDetails>, ApiError> {
        let data = self
            .execute(queries::RUN_DETAILS_QUERY, json!({ "runId": run_id }))
            .await?;
        parser::parse_run_details(&data)
    }

    async fn fetch_workspace(&self) -> Result<Workspace, ApiError> {
        let data = self.execute(queries::WORKSPACE_QUERY, json!({})).await?;
        parser::parse_workspace(&data)
    }

    async fn fetch_permissions(&self) -> Result<Permissions, ApiError> {
        let data = self.execute(queries::PERMISSIONS_QUERY, json!({})).await?;
        parser::parse_permissions(&data)
    }

    async fn launch_reexecution(&self, request: &ReexecutionRequest) -> Result<LaunchOutcome, ApiError> {
        let data = self
            .execute(queries::LAUNCH_REEXECUTION_MUTATION, request.variables())
            .await?;
        Ok(parser::parse_launch_outcome(&data))
    }

    async fn terminate_run(&self, run_id: &str, policy: TerminationPolicy) -> Result<(), RunOpError> {
        let data = self
            .execute(
                queries::TERMINATE_MUTATION,
                json!({ "runId": run_id, "terminatePolicy": policy.as_graphql() }),
            )
            .await?;
        parser::parse_terminate(&data)
    }

    async fn delete_run(&self, run_id: &str) -> Result<(), RunOpError> {
        let data = self
            .execute(queries::DELETE_MUTATION, json!({ "runId": run_id }))
            .await?;
        parser::parse_delete(&data)
    }
}
