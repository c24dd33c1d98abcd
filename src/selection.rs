//! Bulk selection and the eligibility maps derived from it.
//!
//! Eligibility is recomputed on every call; selections are tens of runs, not
//! millions, so there is nothing worth caching.

use crate::run::RunRef;
use indexmap::IndexMap;

/// Run id -> `can_terminate`, in selection order.
pub type Eligibility = IndexMap<String, bool>;

/// Ordered set of selected runs, unique by `id`.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    runs: Vec<RunRef>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs(runs: impl IntoIterator<Item = RunRef>) -> Self {
        let mut set = Self::new();
        for run in runs {
            set.insert(run);
        }
        set
    }

    /// Returns `false` when a run with the same id is already selected.
    pub fn insert(&mut self, run: RunRef) -> bool {
        if self.contains(&run.id) {
            return false;
        }
        self.runs.push(run);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.runs.len();
        self.runs.retain(|r| r.id != id);
        self.runs.len() != before
    }

    /// Selects the run if absent, deselects it otherwise. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, run: &RunRef) -> bool {
        if self.remove(&run.id) {
            false
        } else {
            self.runs.push(run.clone());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.runs.iter().any(|r| r.id == id)
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[RunRef] {
        &self.runs
    }

    /// Replace selected entries with their refreshed rows and drop runs that are
    /// no longer listed.
    pub fn reconcile(&mut self, listed: &[RunRef]) {
        self.runs.retain_mut(|selected| {
            match listed.iter().find(|r| r.id == selected.id) {
                Some(fresh) => {
                    *selected = fresh.clone();
                    true
                }
                None => false,
            }
        });
    }

    pub fn termination_eligibility(&self) -> Eligibility {
        termination_eligibility(&self.runs)
    }

    pub fn deletion_eligibility(&self) -> Eligibility {
        deletion_eligibility(&self.runs)
    }
}

pub fn unfinished(selected: &[RunRef]) -> Vec<&RunRef> {
    selected.iter().filter(|r| !r.is_finished()).collect()
}

/// Only unfinished runs can be terminated.
pub fn termination_eligibility(selected: &[RunRef]) -> Eligibility {
    unfinished(selected)
        .into_iter()
        .map(|r| (r.id.clone(), r.can_terminate))
        .collect()
}

pub fn deletion_eligibility(selected: &[RunRef]) -> Eligibility {
    selected
        .iter()
        .map(|r| (r.id.clone(), r.can_terminate))
        .collect()
}

/// `"Terminate 1 run"`, `"Delete 3 runs"`.
pub fn count_label(verb: &str, count: usize) -> String {
    let noun = if count == 1 { "run" } else { "runs" };
    format!("{verb} {count} {noun}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunStatus;
    use pretty_assertions::assert_eq;

    fn run(id: &str, status: RunStatus, can_terminate: bool) -> RunRef {
        RunRef {
            id: id.to_string(),
            run_id: id.to_string(),
            pipeline_name: "etl".to_string(),
            status,
            can_terminate,
            mode: "default".to_string(),
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn mixed_selection_eligibility() {
        let selection = SelectionSet::from_runs([
            run("A", RunStatus::Success, false),
            run("B", RunStatus::Started, true),
        ]);

        let terminate = selection.termination_eligibility();
        assert_eq!(terminate.into_iter().collect::<Vec<_>>(), vec![("B".to_string(), true)]);

        let delete = selection.deletion_eligibility();
        assert_eq!(
            delete.into_iter().collect::<Vec<_>>(),
            vec![("A".to_string(), false), ("B".to_string(), true)]
        );
        assert_eq!(count_label("Terminate", 1), "Terminate 1 run");
    }

    #[test]
    fn empty_selection_yields_empty_maps() {
        let selection = SelectionSet::new();
        assert!(selection.termination_eligibility().is_empty());
        assert!(selection.deletion_eligibility().is_empty());
        assert_eq!(count_label("Delete", 0), "Delete 0 runs");
    }

    #[test]
    fn termination_keys_are_subset_of_unfinished() {
        let runs = vec![
            run("1", RunStatus::Queued, true),
            run("2", RunStatus::Failure, false),
            run("3", RunStatus::Canceling, false),
            run("4", RunStatus::Canceled, false),
            run("5", RunStatus::Unknown, true),
        ];
        let terminate = termination_eligibility(&runs);
        let keys: Vec<_> = terminate.keys().cloned().collect();
        assert_eq!(keys, vec!["1", "3", "5"]);
        let delete = deletion_eligibility(&runs);
        assert_eq!(delete.len(), runs.len());
    }

    #[test]
    fn unfinished_non_terminable_run_is_still_listed() {
        let runs = vec![run("q", RunStatus::Queued, false)];
        assert_eq!(termination_eligibility(&runs).get("q"), Some(&false));
    }

    #[test]
    fn insert_is_unique_by_id() {
        let mut selection = SelectionSet::new();
        assert!(selection.insert(run("A", RunStatus::Started, true)));
        assert!(!selection.insert(run("A", RunStatus::Success, false)));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut selection = SelectionSet::new();
        let a = run("A", RunStatus::Started, true);
        assert!(selection.toggle(&a));
        assert!(selection.contains("A"));
        assert!(!selection.toggle(&a));
        assert!(selection.is_empty());
    }

    #[test]
    fn reconcile_refreshes_and_drops() {
        let mut selection = SelectionSet::from_runs([
            run("A", RunStatus::Started, true),
            run("B", RunStatus::Started, true),
        ]);
        selection.reconcile(&[run("A", RunStatus::Success, false)]);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.runs()[0].status, RunStatus::Success);
        assert!(selection.termination_eligibility().is_empty());
    }
}
