//! Builds re-execution requests from a run's stored configuration.
//!
//! Construction is pure: nothing here talks to the server. The caller fetches
//! the run details (expensive) only once a menu is opened, then submits the
//! request through [`crate::traits::OrchestratorApi::launch_reexecution`].

use crate::run::{RepositoryMatch, RunDetails, RunTag};
use serde::Serialize;
use serde_json::Value;

/// Tags in this namespace are written by the server and must not be copied
/// onto the new run.
pub const SYSTEM_TAG_PREFIX: &str = "dagster/";
pub const RESUME_RETRY_TAG: &str = "dagster/is_resume_retry";
pub const STEP_SELECTION_TAG: &str = "dagster/step_selection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReexecutionStyle {
    /// Full re-run from scratch.
    All,
    /// Resume from the failed steps of the original run.
    FromFailure,
    /// Re-run only the given steps.
    Selection { step_keys: Vec<String>, query: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ReexecutionError {
    #[error("Re-execute is unavailable because the pipeline is not present in the current workspace")]
    MissingRepositoryMatch,
    #[error("Run has no stored configuration")]
    EmptyConfig,
    #[error("Run has no pipeline snapshot to re-execute from")]
    MissingSnapshot,
    #[error("Malformed run configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReexecutionRequest {
    pub parent_run_id: String,
    pub root_run_id: String,
    pub pipeline_name: String,
    pub mode: String,
    pub solid_selection: Option<Vec<String>>,
    pub run_config: Value,
    pub tags: Vec<RunTag>,
    pub style: ReexecutionStyle,
    pub repository_name: String,
    pub repository_location_name: String,
}

/// Combine a run, its raw YAML config and the repository that still defines
/// its pipeline into a launchable request.
pub fn build(
    run: &RunDetails,
    raw_config_yaml: &str,
    repo_match: Option<&RepositoryMatch>,
    style: ReexecutionStyle,
) -> Result<ReexecutionRequest, ReexecutionError> {
    let repo_match = repo_match.ok_or(ReexecutionError::MissingRepositoryMatch)?;
    if raw_config_yaml.trim().is_empty() {
        return Err(ReexecutionError::EmptyConfig);
    }
    if run.pipeline_snapshot_id.is_none() {
        return Err(ReexecutionError::MissingSnapshot);
    }
    let run_config: Value = serde_yaml::from_str(raw_config_yaml)?;

    let mut tags: Vec<RunTag> = run
        .tags
        .iter()
        .filter(|t| !t.key.starts_with(SYSTEM_TAG_PREFIX))
        .cloned()
        .collect();
    match &style {
        ReexecutionStyle::All => {}
        ReexecutionStyle::FromFailure => tags.push(RunTag {
            key: RESUME_RETRY_TAG.to_string(),
            value: "true".to_string(),
        }),
        ReexecutionStyle::Selection { query, .. } => tags.push(RunTag {
            key: STEP_SELECTION_TAG.to_string(),
            value: query.clone(),
        }),
    }

    Ok(ReexecutionRequest {
        parent_run_id: run.run_id.clone(),
        root_run_id: run.root_run_id.clone().unwrap_or_else(|| run.run_id.clone()),
        pipeline_name: run.pipeline_name.clone(),
        mode: run.mode.clone(),
        solid_selection: run.solid_selection.clone(),
        run_config,
        tags,
        style,
        repository_name: repo_match.repository_name.clone(),
        repository_location_name: repo_match.repository_location_name.clone(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables<'a> {
    execution_params: ExecutionParams<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionParams<'a> {
    mode: &'a str,
    run_config_data: &'a Value,
    selector: Selector<'a>,
    execution_metadata: ExecutionMetadata<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_keys: Option<&'a [String]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Selector<'a> {
    repository_location_name: &'a str,
    repository_name: &'a str,
    pipeline_name: &'a str,
    solid_selection: Option<&'a [String]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionMetadata<'a> {
    parent_run_id: &'a str,
    root_run_id: &'a str,
    tags: &'a [RunTag],
}

impl ReexecutionRequest {
    /// GraphQL variables for the re-execution mutation.
    pub fn variables(&self) -> Value {
        let step_keys = match &self.style {
            ReexecutionStyle::Selection { step_keys, .. } => Some(step_keys.as_slice()),
            ReexecutionStyle::All | ReexecutionStyle::FromFailure => None,
        };
        let vars = Variables {
            execution_params: ExecutionParams {
                mode: &self.mode,
                run_config_data: &self.run_config,
                selector: Selector {
                    repository_location_name: &self.repository_location_name,
                    repository_name: &self.repository_name,
                    pipeline_name: &self.pipeline_name,
                    solid_selection: self.solid_selection.as_deref(),
                },
                execution_metadata: ExecutionMetadata {
                    parent_run_id: &self.parent_run_id,
                    root_run_id: &self.root_run_id,
                    tags: &self.tags,
                },
                step_keys,
            },
        };
        // Only derived `Serialize` impls over strings and JSON values are
        // involved, so this cannot fail.
        serde_json::to_value(vars).unwrap_or(Value::Null)
    }
}
