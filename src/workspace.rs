//! Loaded code locations and matching a run back to the repository that can
//! still execute it.

use crate::run::{MatchType, RepositoryMatch, RunDetails};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEntry {
    pub name: String,
    #[serde(default)]
    pub is_job: bool,
    #[serde(default)]
    pub pipeline_snapshot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub pipelines: Vec<PipelineEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryLocation {
    pub name: String,
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

/// Snapshot of the workspace. Locations that failed to load are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub locations: Vec<RepositoryLocation>,
}

impl Workspace {
    fn repositories(&self) -> impl Iterator<Item = (&RepositoryLocation, &Repository)> {
        self.locations
            .iter()
            .flat_map(|loc| loc.repositories.iter().map(move |repo| (loc, repo)))
    }

    /// Find the repository for a run, preferring an exact origin match, then a
    /// snapshot match, then any repository defining a pipeline of that name.
    pub fn match_run(&self, run: &RunDetails) -> Option<RepositoryMatch> {
        let make = |loc: &RepositoryLocation, repo: &Repository, p: &PipelineEntry, t| {
            RepositoryMatch {
                repository_name: repo.name.clone(),
                repository_location_name: loc.name.clone(),
                is_job: p.is_job,
                match_type: t,
            }
        };
        let snapshot_matches = |p: &PipelineEntry| {
            run.pipeline_snapshot_id.is_some() && p.pipeline_snapshot_id == run.pipeline_snapshot_id
        };

        if let Some(origin) = &run.repository_origin {
            for (loc, repo) in self.repositories() {
                if repo.name != origin.repository_name || loc.name != origin.repository_location_name {
                    continue;
                }
                if let Some(p) = repo.pipelines.iter().find(|p| p.name == run.pipeline_name) {
                    let t = if snapshot_matches(p) {
                        MatchType::OriginAndSnapshot
                    } else {
                        MatchType::OriginOnly
                    };
                    return Some(make(loc, repo, p, t));
                }
            }
        }

        for (loc, repo) in self.repositories() {
            if let Some(p) = repo
                .pipelines
                .iter()
                .find(|p| p.name == run.pipeline_name && snapshot_matches(p))
            {
                return Some(make(loc, repo, p, MatchType::SnapshotOnly));
            }
        }

        self.repositories().find_map(|(loc, repo)| {
            repo.pipelines
                .iter()
                .find(|p| p.name == run.pipeline_name)
                .map(|p| make(loc, repo, p, MatchType::PipelineNameOnly))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RepositoryOrigin;
    use pretty_assertions::assert_eq;

    fn pipeline(name: &str, snap: &str, is_job: bool) -> PipelineEntry {
        PipelineEntry {
            name: name.to_string(),
            is_job,
            pipeline_snapshot_id: Some(snap.to_string()),
        }
    }

    fn workspace() -> Workspace {
        Workspace {
            locations: vec![
                RepositoryLocation {
                    name: "loc_a".to_string(),
                    repositories: vec![Repository {
                        name: "repo_a".to_string(),
                        pipelines: vec![pipeline("etl", "snap_a", true)],
                    }],
                },
                RepositoryLocation {
                    name: "loc_b".to_string(),
                    repositories: vec![Repository {
                        name: "repo_b".to_string(),
                        pipelines: vec![pipeline("etl", "snap_b", false)],
                    }],
                },
            ],
        }
    }

    fn run(origin: Option<(&str, &str)>, snap: Option<&str>) -> RunDetails {
        RunDetails {
            id: "r".to_string(),
            run_id: "r".to_string(),
            pipeline_name: "etl".to_string(),
            pipeline_snapshot_id: snap.map(str::to_string),
            run_config_yaml: String::new(),
            mode: "default".to_string(),
            root_run_id: None,
            parent_run_id: None,
            solid_selection: None,
            tags: vec![],
            repository_origin: origin.map(|(r, l)| RepositoryOrigin {
                repository_name: r.to_string(),
                repository_location_name: l.to_string(),
            }),
        }
    }

    #[test]
    fn origin_and_snapshot() {
        let m = workspace().match_run(&run(Some(("repo_b", "loc_b")), Some("snap_b"))).unwrap();
        assert_eq!(m.repository_name, "repo_b");
        assert_eq!(m.match_type, MatchType::OriginAndSnapshot);
        assert!(!m.is_job);
    }

    #[test]
    fn origin_only_when_snapshot_changed() {
        let m = workspace().match_run(&run(Some(("repo_a", "loc_a")), Some("old"))).unwrap();
        assert_eq!(m.match_type, MatchType::OriginOnly);
        assert!(m.is_job);
    }

    #[test]
    fn snapshot_only_without_origin() {
        let m = workspace().match_run(&run(None, Some("snap_b"))).unwrap();
        assert_eq!(m.repository_location_name, "loc_b");
        assert_eq!(m.match_type, MatchType::SnapshotOnly);
    }

    #[test]
    fn falls_back_to_pipeline_name() {
        let m = workspace().match_run(&run(Some(("gone", "gone")), None)).unwrap();
        assert_eq!(m.repository_name, "repo_a");
        assert_eq!(m.match_type, MatchType::PipelineNameOnly);
    }

    #[test]
    fn no_match_when_pipeline_unknown() {
        let mut r = run(None, None);
        r.pipeline_name = "unknown".to_string();
        assert_eq!(workspace().match_run(&r), None);
        assert_eq!(Workspace::default().match_run(&run(None, None)), None);
    }
}
