// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub const RUNS_QUERY: &str = r"
query RunsRootQuery($limit: Int, $filter: RunsFilter) {
  pipelineRunsOrError(limit: $limit, filter: $filter) {
    __typename
    ... on Runs {
      results {
        id
        runId
        pipelineName
        status
        canTerminate
        mode
        startTime
        endTime
      }
    }
    ... on InvalidPipelineRunsFilterError { message }
    ... on PythonError { message }
  }
}
";

/// Slow on the server (it loads the stored config); only sent when a menu opens.
pub const RUN_DETAILS_QUERY: &str = r"
query PipelineEnvironmentYamlQuery($runId: ID!) {
  pipelineRunOrError(runId: $runId) {
    __typename
    ... on Run {
      id
      runId
      pipelineName
      pipelineSnapshotId
      runConfigYaml
      mode
      rootRunId
      parentRunId
      solidSelection
      tags { key value }
      repositoryOrigin {
        repositoryName
        repositoryLocationName
      }
    }
    ... on RunNotFoundError { message }
    ... on PythonError { message }
  }
}
";

pub const WORKSPACE_QUERY: &str = r"
query WorkspaceQuery {
  workspaceOrError {
    __typename
    ... on Workspace {
      locationEntries {
        name
        locationOrLoadError {
          __typename
          ... on RepositoryLocation {
            name
            repositories {
              name
              pipelines {
                name
                isJob
                pipelineSnapshotId
              }
            }
          }
          ... on PythonError { message }
        }
      }
    }
    ... on PythonError { message }
  }
}
";

pub const PERMISSIONS_QUERY: &str = r"
query PermissionsQuery {
  permissions {
    permission
    value
  }
}
";

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

pub const LAUNCH_REEXECUTION_MUTATION: &str = r"
mutation LaunchPipelineReexecution($executionParams: ExecutionParams) {
  launchPipelineReexecution(executionParams: $executionParams) {
    __typename
    ... on LaunchRunSuccess {
      run { id runId pipelineName }
    }
    ... on InvalidStepError { invalidStepKey }
    ... on InvalidOutputError { stepKey invalidOutputName }
    ... on RunConfigValidationInvalid {
      pipelineName
      errors { message }
    }
    ... on PipelineNotFoundError { message }
    ... on InvalidSubsetError { message }
    ... on ConflictingExecutionParamsError { message }
    ... on PresetNotFoundError { message }
    ... on RunConflict { message }
    ... on UnauthorizedError { message }
    ... on PythonError { message }
  }
}
";

pub const TERMINATE_MUTATION: &str = r"
mutation Terminate($runId: String!, $terminatePolicy: TerminateRunPolicy) {
  terminatePipelineExecution(runId: $runId, terminatePolicy: $terminatePolicy) {
    __typename
    ... on TerminateRunFailure { message }
    ... on RunNotFoundError { message }
    ... on UnauthorizedError { message }
    ... on TerminateRunSuccess {
      run { id canTerminate }
    }
    ... on PythonError { message }
  }
}
";

pub const DELETE_MUTATION: &str = r"
mutation Delete($runId: String!) {
  deletePipelineRun(runId: $runId) {
    __typename
    ... on DeletePipelineRunSuccess { runId }
    ... on RunNotFoundError { message }
    ... on UnauthorizedError { message }
    ... on PythonError { message }
  }
}
";
