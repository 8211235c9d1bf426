// SPDX-License-Identifier: MIT

//! Driver (§4.4): per-task coordination. Races the run pipeline against
//! cancellation and guarantees the `finished` event is notified, then
//! deleted, on every exit path.

use crate::event_cache::{cancelled_topic, finished_topic, EventCache};
use crate::resolver::ResultResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tm_core::{
    Clock, Condition, ConditionFactory, Event, Lock, Operation, OperationFactory, SchedulerError,
    Status, Task, TaskId, TaskResult,
};
use tm_storage::Modifier;

#[derive(Clone)]
pub struct Driver<C> {
    modifier: Arc<Modifier>,
    lock: Arc<dyn Lock>,
    events: Arc<EventCache>,
    resolver: Arc<ResultResolver>,
    operations: Arc<dyn OperationFactory>,
    conditions: Arc<dyn ConditionFactory>,
    clock: C,
}

impl<C: Clock + 'static> Driver<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        modifier: Arc<Modifier>,
        lock: Arc<dyn Lock>,
        events: Arc<EventCache>,
        resolver: Arc<ResultResolver>,
        operations: Arc<dyn OperationFactory>,
        conditions: Arc<dyn ConditionFactory>,
        clock: C,
    ) -> Self {
        Self {
            modifier,
            lock,
            events,
            resolver,
            operations,
            conditions,
            clock,
        }
    }

    /// Drives `id` from pending to a terminal state, or unwinds early if
    /// cancelled. Returns once the task (or its unwind) is fully settled.
    pub async fn drive(&self, id: TaskId) {
        let cancelled = self.events.get(&cancelled_topic(id)).await;
        tokio::select! {
            () = self.run_task(id) => {}
            () = cancelled.wait() => {
                tracing::debug!(task_id = %id, "driver unwound on cancellation");
            }
        }
    }

    async fn run_task(&self, id: TaskId) {
        let Some(task) = self.read_pending(id).await else {
            return;
        };

        let finished = self.events.get(&finished_topic(id)).await;
        let _delete_on_exit = CacheEntryGuard {
            events: &self.events,
            topic: finished_topic(id),
        };

        let Some(operation) = self.operations.create(&task.operation.kind).await else {
            self.fail(id, format!("Operation {} is not supported.", task.operation.kind))
                .await;
            finished.notify().await;
            return;
        };
        let Some(condition) = self.conditions.create(&task.condition.kind).await else {
            self.fail(id, format!("Condition {} is not supported.", task.condition.kind))
                .await;
            finished.notify().await;
            return;
        };

        let mut resolved = HashMap::new();
        for (name, dependency_id) in &task.dependencies {
            match self.resolver.resolve(*dependency_id).await {
                Ok(Some(TaskResult::Completed { result })) => {
                    resolved.insert(name.clone(), result);
                }
                Ok(Some(TaskResult::Cancelled)) => {
                    self.fail_on_dependency(id, *dependency_id, Status::Cancelled).await;
                    finished.notify().await;
                    return;
                }
                Ok(Some(TaskResult::Failed { .. })) => {
                    self.fail_on_dependency(id, *dependency_id, Status::Failed).await;
                    finished.notify().await;
                    return;
                }
                Ok(None) => {
                    self.fail(id, format!("Dependency {dependency_id} not found.")).await;
                    finished.notify().await;
                    return;
                }
                Err(err) => {
                    tracing::error!(task_id = %id, %err, "failed to read state while resolving a dependency");
                    finished.notify().await;
                    return;
                }
            }
        }

        if let Err(err) = condition.wait(&task.condition.parameters).await {
            self.fail(id, format!("Condition {} failed: {err}.", task.condition.kind))
                .await;
            finished.notify().await;
            return;
        }

        {
            let _guard = self.lock.acquire().await;
            if let Err(err) = self.modifier.move_to_running(id, self.clock.now()).await {
                tracing::error!(task_id = %id, %err, "failed to move task to running");
                drop(_guard);
                finished.notify().await;
                return;
            }
        }

        match operation.run(&task.operation.parameters, &resolved).await {
            Ok(result) => {
                let _guard = self.lock.acquire().await;
                if let Err(err) = self
                    .modifier
                    .move_to_completed(id, self.clock.now(), result)
                    .await
                {
                    tracing::error!(task_id = %id, %err, "failed to move task to completed");
                }
            }
            Err(err) => {
                self.fail(id, format!("Operation {} failed: {err}.", task.operation.kind))
                    .await;
            }
        }
        finished.notify().await;
    }

    async fn read_pending(&self, id: TaskId) -> Option<Task> {
        let _guard = self.lock.acquire().await;
        match self.modifier.snapshot().await {
            Ok(state) => match state.status_of(id) {
                Some(Status::Pending) => state.tasks.pending.get(&id).map(|r| r.task.clone()),
                Some(status) => {
                    let err = SchedulerError::UnexpectedTaskStatus { id, status };
                    tracing::error!(task_id = %id, %err, "driver invariant violated, exiting");
                    None
                }
                None => None,
            },
            Err(err) => {
                tracing::error!(task_id = %id, %err, "failed to read state");
                None
            }
        }
    }

    async fn fail_on_dependency(&self, id: TaskId, dependency_id: TaskId, status: Status) {
        let err = SchedulerError::UnsuccessfulDependency { id: dependency_id, status };
        self.fail(id, err.to_string()).await;
    }

    async fn fail(&self, id: TaskId, error: String) {
        let _guard = self.lock.acquire().await;
        if let Err(err) = self.modifier.move_to_failed(id, self.clock.now(), error).await {
            tracing::error!(task_id = %id, %err, "failed to move task to failed");
        }
    }
}

/// Deletes a cache topic when dropped, regardless of which branch of the
/// driver's `select!` unwound the scope.
struct CacheEntryGuard<'a> {
    events: &'a EventCache,
    topic: String,
}

impl Drop for CacheEntryGuard<'_> {
    fn drop(&mut self) {
        self.events.delete(&self.topic);
    }
}
