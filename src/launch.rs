//! Interpreting the result of a launch/re-execution mutation.
//!
//! The handler branches on the outcome kind and either navigates to the new
//! run or raises an alert. It never touches menu or dialog state.

use crate::api::ApiError;
use crate::run::RepositoryMatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Success {
        run_id: String,
    },
    InvalidStep {
        invalid_step_key: String,
    },
    InvalidOutput {
        step_key: String,
        invalid_output_name: String,
    },
    /// The server rejected the run config.
    ConfigInvalid {
        errors: Vec<String>,
    },
    /// Any other typed error result (`PythonError`, `PipelineNotFoundError`, ...).
    Backend {
        kind: String,
        message: String,
    },
    /// Network, HTTP or top-level GraphQL failure; nothing was launched.
    Transport {
        message: String,
    },
    /// The mutation returned no payload at all.
    NoData,
}

impl LaunchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LaunchOutcome::Success { .. })
    }
}

/// A failed mutation request still yields an outcome the handler can alert on.
impl From<ApiError> for LaunchOutcome {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::UnexpectedType { typename, message } => LaunchOutcome::Backend {
                kind: typename,
                message,
            },
            other => LaunchOutcome::Transport {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchBehavior {
    /// Navigate to the new run.
    #[default]
    Open,
    /// Stay put and announce the new run.
    Toast,
}

/// Where the console should go next. Paths are relative to the server root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    Run {
        run_id: String,
    },
    Launchpad {
        repository: Option<(String, String)>,
        pipeline_name: String,
        is_job: bool,
        from_run_id: String,
    },
}

impl NavTarget {
    pub fn launchpad_from_run(
        run_id: &str,
        pipeline_name: &str,
        repo_match: Option<&RepositoryMatch>,
    ) -> Self {
        NavTarget::Launchpad {
            repository: repo_match.map(|m| {
                (
                    m.repository_name.clone(),
                    m.repository_location_name.clone(),
                )
            }),
            pipeline_name: pipeline_name.to_string(),
            is_job: repo_match.is_some_and(|m| m.is_job),
            from_run_id: run_id.to_string(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            NavTarget::Run { run_id } => format!("/instance/runs/{run_id}"),
            NavTarget::Launchpad {
                repository,
                pipeline_name,
                is_job,
                from_run_id,
            } => {
                let kind = if *is_job { "jobs" } else { "pipelines" };
                let suffix = format!("playground/setup-from-run/{from_run_id}");
                match repository {
                    Some((repo, location)) => {
                        format!("/workspace/{repo}@{location}/{kind}/{pipeline_name}/{suffix}")
                    }
                    None => format!("/guess/{kind}/{pipeline_name}/{suffix}"),
                }
            }
        }
    }

    /// Absolute URL on the given server root (no trailing slash expected).
    pub fn url(&self, server_root: &str) -> String {
        format!("{}{}", server_root.trim_end_matches('/'), self.path())
    }
}

pub trait Navigator {
    fn navigate(&self, target: &NavTarget);
}

pub trait Notifier {
    /// Modal alert the user must dismiss.
    fn alert(&self, title: &str, body: &str);
    /// Transient message.
    fn toast(&self, message: &str);
}

/// What [`handle_launch_result`] did, for callers that want to log or test it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchDisposition {
    Navigated(NavTarget),
    Toasted { run_id: String },
    Alerted { title: String, body: String },
}

pub fn handle_launch_result(
    pipeline_name: &str,
    outcome: &LaunchOutcome,
    navigator: &dyn Navigator,
    notifier: &dyn Notifier,
    behavior: LaunchBehavior,
) -> LaunchDisposition {
    let (title, body) = match outcome {
        LaunchOutcome::Success { run_id } => {
            tracing::info!(pipeline = pipeline_name, run_id = %run_id, "launched run");
            return match behavior {
                LaunchBehavior::Open => {
                    let target = NavTarget::Run {
                        run_id: run_id.clone(),
                    };
                    navigator.navigate(&target);
                    LaunchDisposition::Navigated(target)
                }
                LaunchBehavior::Toast => {
                    notifier.toast(&format!("Launched {pipeline_name} run {run_id}"));
                    LaunchDisposition::Toasted {
                        run_id: run_id.clone(),
                    }
                }
            };
        }
        LaunchOutcome::InvalidStep { invalid_step_key } => (
            "Invalid step".to_string(),
            format!("Invalid step: {invalid_step_key}"),
        ),
        LaunchOutcome::InvalidOutput {
            step_key,
            invalid_output_name,
        } => (
            "Invalid output".to_string(),
            format!("Invalid output: {invalid_output_name} for step {step_key}"),
        ),
        LaunchOutcome::ConfigInvalid { errors } => (
            format!("{pipeline_name}: invalid run config"),
            if errors.is_empty() {
                "The run config was rejected".to_string()
            } else {
                errors.join("\n")
            },
        ),
        LaunchOutcome::Backend { kind, message } => (format!("Launch failed ({kind})"), message.clone()),
        LaunchOutcome::Transport { message } => ("Launch failed".to_string(), message.clone()),
        LaunchOutcome::NoData => (
            "Launch failed".to_string(),
            "No data was returned. Is the server still running?".to_string(),
        ),
    };
    tracing::warn!(pipeline = pipeline_name, "launch failed: {body}");
    notifier.alert(&title, &body);
    LaunchDisposition::Alerted { title, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::MatchType;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        navigations: RefCell<Vec<NavTarget>>,
        alerts: RefCell<Vec<(String, String)>>,
        toasts: RefCell<Vec<String>>,
    }

    impl Navigator for Recorder {
        fn navigate(&self, target: &NavTarget) {
            self.navigations.borrow_mut().push(target.clone());
        }
    }

    impl Notifier for Recorder {
        fn alert(&self, title: &str, body: &str) {
            self.alerts.borrow_mut().push((title.to_string(), body.to_string()));
        }
        fn toast(&self, message: &str) {
            self.toasts.borrow_mut().push(message.to_string());
        }
    }

    #[test]
    fn success_with_open_navigates() {
        let rec = Recorder::default();
        let outcome = LaunchOutcome::Success { run_id: "new".to_string() };
        let disposition = handle_launch_result("etl", &outcome, &rec, &rec, LaunchBehavior::Open);
        assert_eq!(
            disposition,
            LaunchDisposition::Navigated(NavTarget::Run { run_id: "new".to_string() })
        );
        assert_eq!(rec.navigations.borrow().len(), 1);
        assert!(rec.alerts.borrow().is_empty());
    }

    #[test]
    fn success_with_toast_does_not_navigate() {
        let rec = Recorder::default();
        let outcome = LaunchOutcome::Success { run_id: "new".to_string() };
        handle_launch_result("etl", &outcome, &rec, &rec, LaunchBehavior::Toast);
        assert!(rec.navigations.borrow().is_empty());
        assert_eq!(rec.toasts.borrow().len(), 1);
    }

    #[test]
    fn invalid_step_alerts_without_navigation() {
        let rec = Recorder::default();
        let outcome = LaunchOutcome::InvalidStep { invalid_step_key: "load".to_string() };
        handle_launch_result("etl", &outcome, &rec, &rec, LaunchBehavior::Open);
        assert!(rec.navigations.borrow().is_empty());
        let alerts = rec.alerts.borrow();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].1.contains("load"));
    }

    #[test]
    fn every_error_kind_alerts() {
        let outcomes = [
            LaunchOutcome::InvalidOutput {
                step_key: "s".to_string(),
                invalid_output_name: "o".to_string(),
            },
            LaunchOutcome::ConfigInvalid { errors: vec!["bad key".to_string()] },
            LaunchOutcome::Backend { kind: "PythonError".to_string(), message: "boom".to_string() },
            LaunchOutcome::Transport { message: "connection refused".to_string() },
            LaunchOutcome::NoData,
        ];
        for outcome in &outcomes {
            let rec = Recorder::default();
            let disposition = handle_launch_result("etl", outcome, &rec, &rec, LaunchBehavior::Open);
            assert!(matches!(disposition, LaunchDisposition::Alerted { .. }), "{outcome:?}");
            assert!(rec.navigations.borrow().is_empty());
        }
    }

    #[test]
    fn backend_message_is_surfaced() {
        let rec = Recorder::default();
        let outcome =
            LaunchOutcome::Backend { kind: "PythonError".to_string(), message: "boom".to_string() };
        handle_launch_result("etl", &outcome, &rec, &rec, LaunchBehavior::Open);
        assert_eq!(rec.alerts.borrow()[0].1, "boom");
    }

    #[test]
    fn run_path() {
        let target = NavTarget::Run { run_id: "abc".to_string() };
        assert_eq!(target.path(), "/instance/runs/abc");
        assert_eq!(target.url("http://localhost:3000/"), "http://localhost:3000/instance/runs/abc");
    }

    #[test]
    fn launchpad_path_with_match() {
        let m = RepositoryMatch {
            repository_name: "repo".to_string(),
            repository_location_name: "loc".to_string(),
            is_job: true,
            match_type: MatchType::OriginOnly,
        };
        let target = NavTarget::launchpad_from_run("r1", "etl", Some(&m));
        assert_eq!(
            target.path(),
            "/workspace/repo@loc/jobs/etl/playground/setup-from-run/r1"
        );
    }

    #[test]
    fn launchpad_path_without_match_guesses_pipeline() {
        let target = NavTarget::launchpad_from_run("r1", "etl", None);
        assert_eq!(target.path(), "/guess/pipelines/etl/playground/setup-from-run/r1");
    }

    #[test]
    fn api_errors_become_outcomes() {
        let typed = LaunchOutcome::from(ApiError::UnexpectedType {
            typename: "PythonError".to_string(),
            message: "boom".to_string(),
        });
        assert_eq!(
            typed,
            LaunchOutcome::Backend {
                kind: "PythonError".to_string(),
                message: "boom".to_string()
            }
        );
        let transport = LaunchOutcome::from(ApiError::Transport("connection refused".to_string()));
        assert_eq!(
            transport,
            LaunchOutcome::Transport {
                message: "connection refused".to_string()
            }
        );
    }
}
