use pretty_assertions::assert_eq;
use runw::api::{ApiError, GraphQlClient};
use runw::launch::LaunchOutcome;
use runw::reexecution::{self, ReexecutionStyle};
use runw::run::{RunDetails, RunStatus};
use runw::traits::OrchestratorApi;
use runw::workflow::{RunOpError, TerminationPolicy};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_answering(operation: &str, body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains(operation))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer) -> GraphQlClient {
    GraphQlClient::new(&server.uri()).unwrap()
}

#[tokio::test]
async fn fetches_run_list() {
    let server = server_answering(
        "RunsRootQuery",
        json!({
            "data": {
                "pipelineRunsOrError": {
                    "__typename": "Runs",
                    "results": [
                        {
                            "id": "r1", "runId": "r1", "pipelineName": "etl",
                            "status": "STARTED", "canTerminate": true, "mode": "default",
                            "startTime": 1700000000.5, "endTime": null
                        },
                        {
                            "id": "r2", "runId": "r2", "pipelineName": "etl",
                            "status": "SOMETHING_NEW", "canTerminate": false, "mode": "default",
                            "startTime": null, "endTime": null
                        }
                    ]
                }
            }
        }),
    )
    .await;

    let runs = client(&server).fetch_runs(25, None).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].status, RunStatus::Started);
    assert!(runs[0].can_terminate);
    // Unknown statuses count as in-flight.
    assert_eq!(runs[1].status, RunStatus::Unknown);
    assert!(!runs[1].is_finished());
}

#[tokio::test]
async fn run_list_sends_limit_and_pipeline_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": { "limit": 5, "filter": { "pipelineName": "etl" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "pipelineRunsOrError": { "__typename": "Runs", "results": [] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runs = client(&server).fetch_runs(5, Some("etl")).await.unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn missing_run_details_are_none() {
    let server = server_answering(
        "PipelineEnvironmentYamlQuery",
        json!({
            "data": {
                "pipelineRunOrError": { "__typename": "RunNotFoundError", "message": "gone" }
            }
        }),
    )
    .await;
    assert_eq!(client(&server).fetch_run_details("r1").await.unwrap(), None);
}

#[tokio::test]
async fn terminate_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": { "runId": "ok", "terminatePolicy": "SAFE_TERMINATE" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "terminatePipelineExecution": {
                "__typename": "TerminateRunSuccess", "run": { "id": "ok", "canTerminate": false }
            } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "runId": "stuck" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "terminatePipelineExecution": {
                "__typename": "TerminateRunFailure", "message": "Run is not in progress"
            } }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    assert_eq!(api.terminate_run("ok", TerminationPolicy::SafeTerminate).await, Ok(()));
    assert_eq!(
        api.terminate_run("stuck", TerminationPolicy::SafeTerminate).await,
        Err(RunOpError::Rejected("Run is not in progress".to_string()))
    );
}

#[tokio::test]
async fn delete_of_unknown_run_is_not_found() {
    let server = server_answering(
        "mutation Delete",
        json!({
            "data": { "deletePipelineRun": {
                "__typename": "RunNotFoundError", "message": "Run r9 could not be found"
            } }
        }),
    )
    .await;
    let err = client(&server).delete_run("r9").await.unwrap_err();
    assert_eq!(err, RunOpError::NotFound("Run r9 could not be found".to_string()));
}

#[tokio::test]
async fn http_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let api = client(&server);
    let err = api.fetch_workspace().await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Transport("Server returned HTTP 500 Internal Server Error: internal error".to_string())
    );
    let op_err = api.delete_run("r1").await.unwrap_err();
    assert!(op_err.is_transport());
}

#[tokio::test]
async fn graphql_errors_array_is_reported() {
    let server = server_answering(
        "PermissionsQuery",
        json!({ "errors": [ { "message": "Cannot query field" } ] }),
    )
    .await;
    let err = client(&server).fetch_permissions().await.unwrap_err();
    assert_eq!(err, ApiError::GraphQl(vec!["Cannot query field".to_string()]));
}

#[tokio::test]
async fn unreachable_server_is_transport() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = GraphQlClient::new(&uri)
        .unwrap()
        .fetch_runs(10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn permissions_default_to_allowed() {
    let server = server_answering(
        "PermissionsQuery",
        json!({
            "data": { "permissions": [
                { "permission": "delete_pipeline_run", "value": false }
            ] }
        }),
    )
    .await;
    let perms = client(&server).fetch_permissions().await.unwrap();
    assert!(perms.can_launch_pipeline_reexecution);
    assert!(perms.can_terminate_pipeline_execution);
    assert!(!perms.can_delete_pipeline_run);
}

fn details() -> RunDetails {
    serde_json::from_value(json!({
        "id": "r1", "runId": "r1", "pipelineName": "etl",
        "pipelineSnapshotId": "snap", "runConfigYaml": "ops:\n  foo: 1\n",
        "mode": "default", "rootRunId": null, "parentRunId": null,
        "solidSelection": null, "tags": [],
        "repositoryOrigin": { "repositoryName": "repo", "repositoryLocationName": "loc" }
    }))
    .unwrap()
}

#[tokio::test]
async fn launch_outcomes_are_decoded() {
    let run = details();
    let workspace = runw::workspace::Workspace {
        locations: vec![serde_json::from_value(json!({
            "name": "loc",
            "repositories": [ { "name": "repo", "pipelines": [ { "name": "etl", "isJob": true } ] } ]
        }))
        .unwrap()],
    };
    let request = reexecution::build(
        &run,
        &run.run_config_yaml,
        workspace.match_run(&run).as_ref(),
        ReexecutionStyle::FromFailure,
    )
    .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": { "executionParams": {
                "selector": { "repositoryName": "repo", "repositoryLocationName": "loc", "pipelineName": "etl" },
                "executionMetadata": { "parentRunId": "r1", "rootRunId": "r1" }
            } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "launchPipelineReexecution": {
                "__typename": "InvalidStepError", "invalidStepKey": "load"
            } }
        })))
        .mount(&server)
        .await;

    let outcome = client(&server).launch_reexecution(&request).await.unwrap();
    assert_eq!(
        outcome,
        LaunchOutcome::InvalidStep {
            invalid_step_key: "load".to_string()
        }
    );
}
