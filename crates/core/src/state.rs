// SPDX-License-Identifier: MIT

//! The aggregate root (§3): five disjoint task maps, a canonical status
//! index, and the dependency/dependent relationship indices.

use crate::{
    CancelledRecord, CompletedRecord, FailedRecord, GenericTask, PendingRecord, RunningRecord,
    Status, TaskId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tasks {
    #[serde(default)]
    pub pending: HashMap<TaskId, PendingRecord>,
    #[serde(default)]
    pub running: HashMap<TaskId, RunningRecord>,
    #[serde(default)]
    pub cancelled: HashMap<TaskId, CancelledRecord>,
    #[serde(default)]
    pub failed: HashMap<TaskId, FailedRecord>,
    #[serde(default)]
    pub completed: HashMap<TaskId, CompletedRecord>,
}

/// Dependency/dependent back-edges. Entries are omitted once their set is
/// empty; callers must remove the key rather than leaving an empty set so
/// the serialized form matches §3 exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub dependents: HashMap<TaskId, HashSet<TaskId>>,
    #[serde(default)]
    pub dependencies: HashMap<TaskId, HashSet<TaskId>>,
}

impl Relationships {
    /// Add the back-edge `dependent depends on dependency`.
    pub fn link(&mut self, dependent: TaskId, dependency: TaskId) {
        self.dependencies
            .entry(dependent)
            .or_default()
            .insert(dependency);
        self.dependents
            .entry(dependency)
            .or_default()
            .insert(dependent);
    }

    /// Drop `id` as a dependent of everything it depended on, and drop its
    /// own (now-irrelevant) dependencies entry. Used when `id` is removed.
    pub fn unlink_as_dependent(&mut self, id: TaskId) {
        if let Some(deps) = self.dependencies.remove(&id) {
            for dependency in deps {
                if let Some(set) = self.dependents.get_mut(&dependency) {
                    set.remove(&id);
                    if set.is_empty() {
                        self.dependents.remove(&dependency);
                    }
                }
            }
        }
    }

    pub fn has_dependents(&self, id: TaskId) -> bool {
        self.dependents.get(&id).is_some_and(|s| !s.is_empty())
    }
}

/// The full scheduler state, as persisted through the `Store`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub tasks: Tasks,
    #[serde(default)]
    pub statuses: HashMap<TaskId, Status>,
    #[serde(default)]
    pub relationships: Relationships,
}

impl State {
    pub fn status_of(&self, id: TaskId) -> Option<Status> {
        self.statuses.get(&id).copied()
    }

    /// Reconstruct the `{task, status}` public view for any known id.
    pub fn generic_task(&self, id: TaskId) -> Option<GenericTask> {
        let status = self.status_of(id)?;
        let task = match status {
            Status::Pending => self.tasks.pending.get(&id).map(|r| r.task.clone()),
            Status::Running => self.tasks.running.get(&id).map(|r| r.task.clone()),
            Status::Cancelled => self.tasks.cancelled.get(&id).map(|r| r.task.clone()),
            Status::Failed => self.tasks.failed.get(&id).map(|r| r.task.clone()),
            Status::Completed => self.tasks.completed.get(&id).map(|r| r.task.clone()),
        }?;
        Some(GenericTask { task, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn link_then_unlink_clears_both_sides() {
        let mut rel = Relationships::default();
        let a = TaskId::new();
        let b = TaskId::new();
        rel.link(a, b);
        assert!(rel.has_dependents(b));
        rel.unlink_as_dependent(a);
        assert!(!rel.has_dependents(b));
        assert!(rel.dependencies.get(&a).is_none());
    }

    /// Deterministic id drawn from a small pool, so proptest-generated pairs
    /// collide with each other often enough to exercise the set-merge paths
    /// in `link`/`unlink_as_dependent`.
    fn id(n: u8) -> TaskId {
        uuid::Uuid::from_u128(n as u128).into()
    }

    fn pairs() -> impl Strategy<Value = Vec<(u8, u8)>> {
        proptest::collection::vec((0u8..6, 0u8..6), 0..20)
    }

    proptest! {
        /// §8 invariant 2: `dependents` and `dependencies` are exact mirrors.
        #[test]
        fn dependents_and_dependencies_are_exact_mirrors(pairs in pairs()) {
            let mut rel = Relationships::default();
            for (dependent, dependency) in &pairs {
                if dependent != dependency {
                    rel.link(id(*dependent), id(*dependency));
                }
            }
            for a in 0u8..6 {
                for b in 0u8..6 {
                    let a_depends_on_b = rel.dependencies.get(&id(a)).is_some_and(|s| s.contains(&id(b)));
                    let b_has_a_as_dependent = rel.dependents.get(&id(b)).is_some_and(|s| s.contains(&id(a)));
                    prop_assert_eq!(a_depends_on_b, b_has_a_as_dependent);
                }
            }
        }

        /// §8 invariant 5: Serialize(Deserialize(x)) == x for any valid state.
        #[test]
        fn state_round_trips_through_json(pairs in pairs()) {
            let mut state = State::default();
            for (dependent, dependency) in &pairs {
                if dependent != dependency {
                    state.relationships.link(id(*dependent), id(*dependency));
                }
            }
            let json = serde_json::to_value(&state).expect("serialize");
            let back: State = serde_json::from_value(json).expect("deserialize");
            prop_assert_eq!(state, back);
        }
    }
}
