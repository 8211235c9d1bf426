// SPDX-License-Identifier: MIT

//! The Modifier: the only write path to `State` (§4.1).
//!
//! Every public method here is *read → validate → mutate → write*: it reads
//! the current state from the store, validates the requested transition,
//! mutates an in-memory copy, and writes the copy back. If serialization or
//! the store write fails, the in-memory mutation is discarded and the store
//! is left exactly as it was. None of this acquires a lock itself — callers
//! (Adder, Canceller, the Driver, the Reaper) hold the exclusive `Lock` for
//! the duration of the call.

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;
use tm_core::{
    CancelledRecord, CompletedRecord, FailedRecord, FinishedTask, ModifierError, PendingRecord,
    RunningRecord, Specification, State, Status, Store, Task, TaskId,
};

pub struct Modifier {
    store: Arc<dyn Store<Json>>,
}

impl Modifier {
    pub fn new(store: Arc<dyn Store<Json>>) -> Self {
        Self { store }
    }

    async fn read_state(&self) -> Result<State, ModifierError> {
        let value = self
            .store
            .get()
            .await
            .map_err(ModifierError::Store)?;
        Ok(serde_json::from_value(value)?)
    }

    async fn write_state(&self, state: &State) -> Result<(), ModifierError> {
        let value = serde_json::to_value(state)?;
        self.store.set(value).await.map_err(ModifierError::Store)
    }

    /// A read-only snapshot of the current state, used by the Resolver and
    /// Readers — both need the exact same lock-then-load-then-release
    /// discipline the Modifier already implements for its own reads.
    pub async fn snapshot(&self) -> Result<State, ModifierError> {
        self.read_state().await
    }

    /// Admit a new pending task. Fails with `DependencyNotFound` (reported
    /// against `id`, the admitted task) if any declared dependency is
    /// unknown; nothing is mutated in that case.
    pub async fn add_pending(
        &self,
        id: TaskId,
        operation: Specification,
        condition: Specification,
        dependencies: HashMap<String, TaskId>,
        scheduled: DateTime<Utc>,
    ) -> Result<PendingRecord, ModifierError> {
        let mut state = self.read_state().await?;

        for dependency in dependencies.values() {
            if !state.statuses.contains_key(dependency) {
                return Err(ModifierError::DependencyNotFound(id));
            }
        }

        let task = Task {
            id,
            operation,
            condition,
            dependencies: dependencies.clone(),
        };
        let record = PendingRecord {
            task,
            scheduled,
        };

        state.tasks.pending.insert(id, record.clone());
        state.statuses.insert(id, Status::Pending);
        for dependency in dependencies.values() {
            state.relationships.link(id, *dependency);
        }

        self.write_state(&state).await?;
        tracing::debug!(task_id = %id, "task admitted as pending");
        Ok(record)
    }

    fn require_status(
        state: &State,
        id: TaskId,
        expected: Status,
    ) -> Result<(), ModifierError> {
        match state.statuses.get(&id) {
            None => Err(ModifierError::TaskNotFound(id)),
            Some(&status) if status == expected => Ok(()),
            Some(&status) => Err(ModifierError::TaskStatusError { id, status }),
        }
    }

    pub async fn move_to_running(
        &self,
        id: TaskId,
        started: DateTime<Utc>,
    ) -> Result<RunningRecord, ModifierError> {
        let mut state = self.read_state().await?;
        Self::require_status(&state, id, Status::Pending)?;

        let pending = state
            .tasks
            .pending
            .remove(&id)
            .ok_or(ModifierError::TaskNotFound(id))?;
        let record = RunningRecord {
            task: pending.task,
            scheduled: pending.scheduled,
            started,
        };
        state.tasks.running.insert(id, record.clone());
        state.statuses.insert(id, Status::Running);

        self.write_state(&state).await?;
        tracing::debug!(task_id = %id, "task moved to running");
        Ok(record)
    }

    /// Requires status ∈ {pending, running}. Carries `started` forward from
    /// a running record; records `None` if cancelled while still pending.
    pub async fn move_to_cancelled(
        &self,
        id: TaskId,
        cancelled: DateTime<Utc>,
    ) -> Result<CancelledRecord, ModifierError> {
        let mut state = self.read_state().await?;
        let status = state
            .statuses
            .get(&id)
            .copied()
            .ok_or(ModifierError::TaskNotFound(id))?;

        let record = match status {
            Status::Pending => {
                let pending = state
                    .tasks
                    .pending
                    .remove(&id)
                    .ok_or(ModifierError::TaskNotFound(id))?;
                CancelledRecord {
                    task: pending.task,
                    scheduled: pending.scheduled,
                    started: None,
                    cancelled,
                }
            }
            Status::Running => {
                let running = state
                    .tasks
                    .running
                    .remove(&id)
                    .ok_or(ModifierError::TaskNotFound(id))?;
                CancelledRecord {
                    task: running.task,
                    scheduled: running.scheduled,
                    started: Some(running.started),
                    cancelled,
                }
            }
            other => return Err(ModifierError::TaskStatusError { id, status: other }),
        };

        state.tasks.cancelled.insert(id, record.clone());
        state.statuses.insert(id, Status::Cancelled);

        self.write_state(&state).await?;
        tracing::debug!(task_id = %id, "task moved to cancelled");
        Ok(record)
    }

    pub async fn move_to_failed(
        &self,
        id: TaskId,
        failed: DateTime<Utc>,
        error: String,
    ) -> Result<FailedRecord, ModifierError> {
        let mut state = self.read_state().await?;
        Self::require_status(&state, id, Status::Running)?;

        let running = state
            .tasks
            .running
            .remove(&id)
            .ok_or(ModifierError::TaskNotFound(id))?;
        let record = FailedRecord {
            task: running.task,
            scheduled: running.scheduled,
            started: running.started,
            failed,
            error,
        };
        state.tasks.failed.insert(id, record.clone());
        state.statuses.insert(id, Status::Failed);

        self.write_state(&state).await?;
        tracing::debug!(task_id = %id, "task moved to failed");
        Ok(record)
    }

    pub async fn move_to_completed(
        &self,
        id: TaskId,
        completed: DateTime<Utc>,
        result: Json,
    ) -> Result<CompletedRecord, ModifierError> {
        let mut state = self.read_state().await?;
        Self::require_status(&state, id, Status::Running)?;

        let running = state
            .tasks
            .running
            .remove(&id)
            .ok_or(ModifierError::TaskNotFound(id))?;
        let record = CompletedRecord {
            task: running.task,
            scheduled: running.scheduled,
            started: running.started,
            completed,
            result,
        };
        state.tasks.completed.insert(id, record.clone());
        state.statuses.insert(id, Status::Completed);

        self.write_state(&state).await?;
        tracing::debug!(task_id = %id, "task moved to completed");
        Ok(record)
    }

    /// One removal pass's candidates: finished tasks with no live
    /// dependents. Read under the caller's lock; the predicate (a
    /// `CleaningStrategy::evaluate` call, arbitrary user code) is evaluated
    /// by the caller *after* the lock has been released — see the Reaper.
    pub async fn removal_candidates(&self) -> Result<Vec<FinishedTask>, ModifierError> {
        let state = self.read_state().await?;
        let mut candidates = Vec::new();

        for (&id, record) in &state.tasks.cancelled {
            if !state.relationships.has_dependents(id) {
                candidates.push(FinishedTask::Cancelled(record.clone()));
            }
        }
        for (&id, record) in &state.tasks.failed {
            if !state.relationships.has_dependents(id) {
                candidates.push(FinishedTask::Failed(record.clone()));
            }
        }
        for (&id, record) in &state.tasks.completed {
            if !state.relationships.has_dependents(id) {
                candidates.push(FinishedTask::Completed(record.clone()));
            }
        }

        Ok(candidates)
    }

    /// Re-validate `id` is still a finished task with no live dependents
    /// (state may have changed since it was offered as a candidate) and, if
    /// so, remove it: clear its own `dependencies` entry, drop the back-edge
    /// from each of its dependencies, and remove its task/status records.
    /// Returns `false` (no mutation, no write) if `id` is no longer
    /// eligible.
    pub async fn remove_if_still_eligible(&self, id: TaskId) -> Result<bool, ModifierError> {
        let mut state = self.read_state().await?;

        let Some(status) = state.statuses.get(&id).copied() else {
            return Ok(false);
        };
        if !status.is_terminal() || state.relationships.has_dependents(id) {
            return Ok(false);
        }

        match status {
            Status::Cancelled => {
                state.tasks.cancelled.remove(&id);
            }
            Status::Failed => {
                state.tasks.failed.remove(&id);
            }
            Status::Completed => {
                state.tasks.completed.remove(&id);
            }
            Status::Pending | Status::Running => unreachable!("checked is_terminal above"),
        }
        state.statuses.remove(&id);
        state.relationships.unlink_as_dependent(id);

        self.write_state(&state).await?;
        tracing::debug!(task_id = %id, "task removed");
        Ok(true)
    }
}

#[cfg(test)]
#[path = "modifier_tests.rs"]
mod tests;
