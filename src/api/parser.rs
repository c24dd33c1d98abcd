//! Turns GraphQL response payloads into domain types.
//!
//! Every union result is dispatched on `__typename`. Error members all carry a
//! `message` field, which is what the user gets to see.

use super::ApiError;
use crate::launch::LaunchOutcome;
use crate::run::{Permissions, RunDetails, RunRef};
use crate::workflow::RunOpError;
use crate::workspace::{RepositoryLocation, Workspace};
use serde_json::Value;

fn typename(v: &Value) -> &str {
    v.get("__typename").and_then(Value::as_str).unwrap_or("")
}

fn message(v: &Value) -> String {
    v.get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string()
}

fn unexpected(v: &Value) -> ApiError {
    ApiError::UnexpectedType {
        typename: typename(v).to_string(),
        message: message(v),
    }
}

/// Split a raw response body into its `data` member, failing on a top-level
/// `errors` array.
pub fn extract_data(body: Value) -> Result<Value, ApiError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(ApiError::GraphQl(errors.iter().map(message).collect()));
        }
    }
    match body.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(ApiError::Decode("response has no data".to_string())),
    }
}

pub fn parse_runs(data: &Value) -> Result<Vec<RunRef>, ApiError> {
    let result = &data["pipelineRunsOrError"];
    if typename(result) != "Runs" {
        return Err(unexpected(result));
    }
    let runs = serde_json::from_value(result["results"].clone())?;
    Ok(runs)
}

pub fn parse_run_details(data: &Value) -> Result<Option<RunDetails>, ApiError> {
    let result = &data["pipelineRunOrError"];
    match typename(result) {
        "Run" => Ok(Some(serde_json::from_value(result.clone())?)),
        "RunNotFoundError" => Ok(None),
        _ => Err(unexpected(result)),
    }
}

pub fn parse_workspace(data: &Value) -> Result<Workspace, ApiError> {
    let result = &data["workspaceOrError"];
    if typename(result) != "Workspace" {
        return Err(unexpected(result));
    }
    let entries = result["locationEntries"].as_array().cloned().unwrap_or_default();
    let mut locations = Vec::with_capacity(entries.len());
    for entry in entries {
        let location = &entry["locationOrLoadError"];
        match typename(location) {
            "RepositoryLocation" => {
                let loc: RepositoryLocation = serde_json::from_value(location.clone())?;
                locations.push(loc);
            }
            _ => {
                // Location failed to load; runs from it simply won't match.
                tracing::warn!(
                    "skipping code location {}: {}",
                    entry["name"].as_str().unwrap_or("?"),
                    message(location)
                );
            }
        }
    }
    Ok(Workspace { locations })
}

pub fn parse_permissions(data: &Value) -> Result<Permissions, ApiError> {
    let list = data["permissions"]
        .as_array()
        .ok_or_else(|| ApiError::Decode("permissions is not a list".to_string()))?;
    let lookup = |name: &str| {
        list.iter()
            .find(|p| p["permission"].as_str() == Some(name))
            .and_then(|p| p["value"].as_bool())
            .unwrap_or(true)
    };
    Ok(Permissions {
        can_launch_pipeline_reexecution: lookup("launch_pipeline_reexecution"),
        can_terminate_pipeline_execution: lookup("terminate_pipeline_execution"),
        can_delete_pipeline_run: lookup("delete_pipeline_run"),
    })
}

pub fn parse_launch_outcome(data: &Value) -> LaunchOutcome {
    let result = &data["launchPipelineReexecution"];
    if result.is_null() {
        return LaunchOutcome::NoData;
    }
    match typename(result) {
        "LaunchRunSuccess" => match result["run"]["runId"].as_str() {
            Some(run_id) => LaunchOutcome::Success {
                run_id: run_id.to_string(),
            },
            None => LaunchOutcome::NoData,
        },
        "InvalidStepError" => LaunchOutcome::InvalidStep {
            invalid_step_key: result["invalidStepKey"].as_str().unwrap_or("").to_string(),
        },
        "InvalidOutputError" => LaunchOutcome::InvalidOutput {
            step_key: result["stepKey"].as_str().unwrap_or("").to_string(),
            invalid_output_name: result["invalidOutputName"].as_str().unwrap_or("").to_string(),
        },
        "RunConfigValidationInvalid" => LaunchOutcome::ConfigInvalid {
            errors: result["errors"]
                .as_array()
                .map(|errs| errs.iter().map(message).collect())
                .unwrap_or_default(),
        },
        other => LaunchOutcome::Backend {
            kind: other.to_string(),
            message: message(result),
        },
    }
}

pub fn parse_terminate(data: &Value) -> Result<(), RunOpError> {
    let result = &data["terminatePipelineExecution"];
    match typename(result) {
        "TerminateRunSuccess" => Ok(()),
        "TerminateRunFailure" => Err(RunOpError::Rejected(message(result))),
        other => Err(classify_failure(other, result)),
    }
}

pub fn parse_delete(data: &Value) -> Result<(), RunOpError> {
    let result = &data["deletePipelineRun"];
    match typename(result) {
        "DeletePipelineRunSuccess" => Ok(()),
        other => Err(classify_failure(other, result)),
    }
}

fn classify_failure(typename: &str, result: &Value) -> RunOpError {
    match typename {
        "RunNotFoundError" => RunOpError::NotFound(message(result)),
        "UnauthorizedError" => RunOpError::Unauthorized(message(result)),
        "" => RunOpError::Backend("No data was returned".to_string()),
        _ => RunOpError::Backend(message(result)),
    }
}
