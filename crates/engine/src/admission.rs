// SPDX-License-Identifier: MIT

//! Adder and Canceller (§4.5): the two request-driven entry points that
//! mutate state, each holding the exclusive lock for the whole operation.

use crate::event_cache::{cancelled_topic, finished_topic, EventCache};
use std::sync::Arc;
use tm_core::{
    CancelRequest, CancelledRecord, Clock, ConditionFactory, Event, GenericTask, Lock,
    OperationFactory, Queue, ScheduleRequest, SchedulerError, Status, TaskId,
};
use tm_storage::Modifier;

pub struct Adder<C> {
    modifier: Arc<Modifier>,
    lock: Arc<dyn Lock>,
    queue: Arc<dyn Queue<TaskId>>,
    operations: Arc<dyn OperationFactory>,
    conditions: Arc<dyn ConditionFactory>,
    clock: C,
}

impl<C: Clock> Adder<C> {
    pub fn new(
        modifier: Arc<Modifier>,
        lock: Arc<dyn Lock>,
        queue: Arc<dyn Queue<TaskId>>,
        operations: Arc<dyn OperationFactory>,
        conditions: Arc<dyn ConditionFactory>,
        clock: C,
    ) -> Self {
        Self {
            modifier,
            lock,
            queue,
            operations,
            conditions,
            clock,
        }
    }

    pub async fn add(&self, request: ScheduleRequest) -> Result<GenericTask, SchedulerError> {
        let _guard = self.lock.acquire().await;

        if self.operations.create(&request.operation.kind).await.is_none() {
            return Err(SchedulerError::InvalidOperation(request.operation.kind));
        }
        if self.conditions.create(&request.condition.kind).await.is_none() {
            return Err(SchedulerError::InvalidCondition(request.condition.kind));
        }

        let id = TaskId::new();
        let record = self
            .modifier
            .add_pending(
                id,
                request.operation,
                request.condition,
                request.dependencies,
                self.clock.now(),
            )
            .await?;
        self.queue.put(id).await;

        tracing::info!(task_id = %id, "task scheduled");
        Ok(GenericTask {
            task: record.task,
            status: Status::Pending,
        })
    }
}

pub struct Canceller<C> {
    modifier: Arc<Modifier>,
    lock: Arc<dyn Lock>,
    events: Arc<EventCache>,
    clock: C,
}

impl<C: Clock> Canceller<C> {
    pub fn new(modifier: Arc<Modifier>, lock: Arc<dyn Lock>, events: Arc<EventCache>, clock: C) -> Self {
        Self {
            modifier,
            lock,
            events,
            clock,
        }
    }

    pub async fn cancel(&self, request: CancelRequest) -> Result<CancelledRecord, SchedulerError> {
        let _guard = self.lock.acquire().await;

        let record = self
            .modifier
            .move_to_cancelled(request.id, self.clock.now())
            .await?;

        self.events.get(&cancelled_topic(request.id)).await.notify().await;
        self.events.get(&finished_topic(request.id)).await.notify().await;

        tracing::info!(task_id = %request.id, "task cancelled");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Value as Json;
    use std::collections::HashMap;
    use tm_adapters::{MemoryQueue, MemoryStore, NotifyEventFactory, TokioLock};
    use tm_core::{DynError, FakeClock, Specification, State};

    struct KnownOnly(&'static str);

    #[async_trait]
    impl OperationFactory for KnownOnly {
        async fn create(&self, kind: &str) -> Option<Arc<dyn tm_core::Operation>> {
            (kind == self.0).then_some(Arc::new(Noop) as Arc<dyn tm_core::Operation>)
        }
    }

    #[async_trait]
    impl ConditionFactory for KnownOnly {
        async fn create(&self, kind: &str) -> Option<Arc<dyn tm_core::Condition>> {
            (kind == self.0).then_some(Arc::new(Noop) as Arc<dyn tm_core::Condition>)
        }
    }

    struct Noop;

    #[async_trait]
    impl tm_core::Operation for Noop {
        async fn run(&self, _: &HashMap<String, Json>, _: &HashMap<String, Json>) -> Result<Json, DynError> {
            Ok(Json::Null)
        }
    }

    #[async_trait]
    impl tm_core::Condition for Noop {
        async fn wait(&self, _: &HashMap<String, Json>) -> Result<(), DynError> {
            Ok(())
        }
    }

    fn adder() -> (Arc<Modifier>, Arc<dyn Queue<TaskId>>, Adder<FakeClock>) {
        let initial = serde_json::to_value(State::default()).expect("serialize");
        let modifier = Arc::new(Modifier::new(Arc::new(MemoryStore::new(initial))));
        let lock: Arc<dyn Lock> = Arc::new(TokioLock::new());
        let queue: Arc<dyn Queue<TaskId>> = Arc::new(MemoryQueue::new());
        let adder = Adder::new(
            modifier.clone(),
            lock,
            queue.clone(),
            Arc::new(KnownOnly("echo")),
            Arc::new(KnownOnly("always")),
            FakeClock::new(),
        );
        (modifier, queue, adder)
    }

    #[tokio::test]
    async fn add_enqueues_and_returns_a_pending_view() {
        let (_, queue, adder) = adder();
        let request = ScheduleRequest {
            operation: Specification::new("echo", HashMap::new()),
            condition: Specification::new("always", HashMap::new()),
            dependencies: HashMap::new(),
        };

        let task = adder.add(request).await.unwrap();
        assert_eq!(task.status, Status::Pending);
        assert_eq!(queue.get().await, Some(task.task.id));
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected_before_any_mutation() {
        let (modifier, _, adder) = adder();
        let request = ScheduleRequest {
            operation: Specification::new("nope", HashMap::new()),
            condition: Specification::new("always", HashMap::new()),
            dependencies: HashMap::new(),
        };

        let err = adder.add(request).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidOperation(kind) if kind == "nope"));
        let state = modifier.snapshot().await.unwrap();
        assert!(state.statuses.is_empty());
    }

    #[tokio::test]
    async fn cancel_notifies_both_topics() {
        let initial = serde_json::to_value(State::default()).expect("serialize");
        let modifier = Arc::new(Modifier::new(Arc::new(MemoryStore::new(initial))));
        let lock: Arc<dyn Lock> = Arc::new(TokioLock::new());
        let events = Arc::new(EventCache::new(Arc::new(NotifyEventFactory::new())));
        let id = TaskId::new();
        modifier
            .add_pending(
                id,
                Specification::new("echo", HashMap::new()),
                Specification::new("always", HashMap::new()),
                HashMap::new(),
                Utc::now(),
            )
            .await
            .unwrap();

        let canceller = Canceller::new(modifier, lock, events.clone(), FakeClock::new());
        canceller.cancel(CancelRequest { id }).await.unwrap();

        events.get(&cancelled_topic(id)).await.wait().await;
        events.get(&finished_topic(id)).await.wait().await;
    }
}
