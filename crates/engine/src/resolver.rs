// SPDX-License-Identifier: MIT

//! Result Resolver (§4.3): resolves a task id to its outcome, racing a
//! watcher against a state read to avoid missing a notification that lands
//! between them.

use crate::event_cache::{finished_topic, EventCache};
use std::sync::Arc;
use tm_core::{FinishedTask, Lock, ModifierError, Status, TaskId, TaskResult};
use tm_storage::Modifier;

pub struct ResultResolver {
    modifier: Arc<Modifier>,
    lock: Arc<dyn Lock>,
    events: Arc<EventCache>,
}

impl ResultResolver {
    pub fn new(
        modifier: Arc<Modifier>,
        lock: Arc<dyn Lock>,
        events: Arc<EventCache>,
    ) -> Self {
        Self {
            modifier,
            lock,
            events,
        }
    }

    /// `None` if `id` is unknown (or was removed while we were waiting).
    pub async fn resolve(&self, id: TaskId) -> Result<Option<TaskResult>, ModifierError> {
        // The watcher is acquired *before* the state read below so a notify
        // landing between the read and the wait can never be missed.
        let event = self.events.get(&finished_topic(id)).await;

        {
            let _guard = self.lock.acquire().await;
            let state = self.modifier.snapshot().await?;
            match state.status_of(id) {
                None => return Ok(None),
                Some(status) if status.is_terminal() => {
                    return Ok(Some(terminal_result(&state, id, status)));
                }
                Some(_) => {}
            }
        }

        event.wait().await;

        let _guard = self.lock.acquire().await;
        let state = self.modifier.snapshot().await?;
        match state.status_of(id) {
            Some(status) if status.is_terminal() => Ok(Some(terminal_result(&state, id, status))),
            _ => Ok(None),
        }
    }
}

fn terminal_result(state: &tm_core::State, id: TaskId, status: Status) -> TaskResult {
    match status {
        Status::Cancelled => TaskResult::Cancelled,
        Status::Failed => {
            let error = state
                .tasks
                .failed
                .get(&id)
                .map(|r| r.error.clone())
                .unwrap_or_default();
            TaskResult::Failed { error }
        }
        Status::Completed => {
            let result = state
                .tasks
                .completed
                .get(&id)
                .map(|r| r.result.clone())
                .unwrap_or(serde_json::Value::Null);
            TaskResult::Completed { result }
        }
        Status::Pending | Status::Running => {
            unreachable!("terminal_result only called for terminal statuses")
        }
    }
}

/// Materializes a [`FinishedTask`] for an already-terminal id, used by
/// callers that need the full record rather than just the `TaskResult`.
pub fn finished_task(state: &tm_core::State, id: TaskId) -> Option<FinishedTask> {
    match state.status_of(id)? {
        Status::Cancelled => state
            .tasks
            .cancelled
            .get(&id)
            .cloned()
            .map(FinishedTask::Cancelled),
        Status::Failed => state
            .tasks
            .failed
            .get(&id)
            .cloned()
            .map(FinishedTask::Failed),
        Status::Completed => state
            .tasks
            .completed
            .get(&id)
            .cloned()
            .map(FinishedTask::Completed),
        Status::Pending | Status::Running => None,
    }
}
