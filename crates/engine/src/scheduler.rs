// SPDX-License-Identifier: MIT

//! Scheduler facade (§4.9): the top-level entry point a host constructs
//! once, wiring the seven plugin collaborators into the Modifier, event
//! cache, resolver, admission/cancellation/reaping components and readers.
//! Carries no scheduling logic of its own.

use crate::admission::{Adder, Canceller};
use crate::dispatcher::{Dispatcher, DispatcherHandle};
use crate::driver::Driver;
use crate::event_cache::EventCache;
use crate::reaper::Reaper;
use crate::readers::Readers;
use crate::resolver::ResultResolver;
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tm_core::{
    CancelRequest, CancelledRecord, CleanRequest, CleaningResult, CleaningStrategyFactory, Clock,
    ConditionFactory, EventFactory, GenericTask, Lock, OperationFactory, Queue, ScheduleRequest,
    SchedulerError, Specification, Store, TaskId, TaskResult,
};
use tm_storage::Modifier;
use tokio::task::JoinHandle;

const RESTART_FAILURE_MESSAGE: &str =
    "Task was running when the scheduler was constructed and could not be resumed.";

/// The seven plugin collaborators (§6) plus the clock and an optional
/// periodic cleaning configuration, gathered for `Scheduler::new`.
pub struct SchedulerConfig<C> {
    pub store: Arc<dyn Store<Json>>,
    pub lock: Arc<dyn Lock>,
    pub queue: Arc<dyn Queue<TaskId>>,
    pub events: Arc<dyn EventFactory>,
    pub operations: Arc<dyn OperationFactory>,
    pub conditions: Arc<dyn ConditionFactory>,
    pub cleaning_strategies: Arc<dyn CleaningStrategyFactory>,
    pub clock: C,
    pub periodic_cleaning: Option<PeriodicCleaning>,
}

/// A cleaning strategy run on a fixed interval for as long as `run()`'s
/// handle is alive.
pub struct PeriodicCleaning {
    pub strategy: Specification,
    pub interval: Duration,
}

pub struct Scheduler<C> {
    lock: Arc<dyn Lock>,
    queue: Arc<dyn Queue<TaskId>>,
    resolver: Arc<ResultResolver>,
    adder: Adder<C>,
    canceller: Canceller<C>,
    reaper: Reaper,
    readers: Readers,
    driver: Driver<C>,
    periodic_cleaning: Option<PeriodicCleaning>,
}

impl<C: Clock + Send + Sync + 'static> Scheduler<C> {
    /// Builds the scheduler and sweeps any task persisted as `running` into
    /// `failed` — a prior process owned that task and cannot be assumed to
    /// have left it safe to resume (§9, restart semantics).
    pub async fn new(config: SchedulerConfig<C>) -> Result<Self, SchedulerError> {
        let modifier = Arc::new(Modifier::new(config.store));
        let events = Arc::new(EventCache::new(config.events));
        let resolver = Arc::new(ResultResolver::new(
            modifier.clone(),
            config.lock.clone(),
            events.clone(),
        ));

        {
            let _guard = config.lock.acquire().await;
            let state = modifier.snapshot().await?;
            let running: Vec<TaskId> = state.tasks.running.keys().copied().collect();
            for id in running {
                tracing::warn!(task_id = %id, "failing task that was running at construction");
                modifier
                    .move_to_failed(id, config.clock.now(), RESTART_FAILURE_MESSAGE.to_string())
                    .await?;
            }
        }

        let adder = Adder::new(
            modifier.clone(),
            config.lock.clone(),
            config.queue.clone(),
            config.operations.clone(),
            config.conditions.clone(),
            config.clock.clone(),
        );
        let canceller = Canceller::new(
            modifier.clone(),
            config.lock.clone(),
            events.clone(),
            config.clock.clone(),
        );
        let reaper = Reaper::new(modifier.clone(), config.lock.clone(), config.cleaning_strategies);
        let readers = Readers::new(modifier.clone(), config.lock.clone());
        let driver = Driver::new(
            modifier.clone(),
            config.lock.clone(),
            events,
            resolver.clone(),
            config.operations,
            config.conditions,
            config.clock,
        );

        Ok(Self {
            lock: config.lock,
            queue: config.queue,
            resolver,
            adder,
            canceller,
            reaper,
            readers,
            driver,
            periodic_cleaning: config.periodic_cleaning,
        })
    }

    pub async fn schedule(&self, request: ScheduleRequest) -> Result<GenericTask, SchedulerError> {
        self.adder.add(request).await
    }

    pub async fn cancel(&self, request: CancelRequest) -> Result<CancelledRecord, SchedulerError> {
        self.canceller.cancel(request).await
    }

    pub async fn resolve(&self, id: TaskId) -> Result<Option<TaskResult>, SchedulerError> {
        Ok(self.resolver.resolve(id).await?)
    }

    pub async fn clean(&self, request: CleanRequest) -> Result<CleaningResult, SchedulerError> {
        self.reaper.clean(request).await
    }

    pub fn tasks(&self) -> &Readers {
        &self.readers
    }

    /// Starts the Dispatcher (and, if configured, the periodic Reaper loop)
    /// as background activities. Stop them with the returned handle's
    /// `shutdown`, or let its `Drop` abort them.
    pub fn run(&self) -> RunHandle {
        let dispatcher = Dispatcher::new(self.queue.clone(), self.driver.clone()).run();

        let periodic = self.periodic_cleaning.as_ref().map(|periodic| {
            let reaper = self.reaper.clone();
            let strategy = periodic.strategy.clone();
            let mut ticks = tokio::time::interval(periodic.interval);
            tokio::spawn(async move {
                loop {
                    ticks.tick().await;
                    if let Err(err) = reaper
                        .clean(CleanRequest {
                            strategy: strategy.clone(),
                        })
                        .await
                    {
                        tracing::error!(%err, "periodic clean failed");
                    }
                }
            })
        });

        RunHandle {
            dispatcher,
            periodic,
        }
    }
}

/// RAII guard for the engine's background activities. `shutdown` stops them
/// cleanly and awaits every outstanding driver; dropping without calling it
/// aborts them without waiting.
pub struct RunHandle {
    dispatcher: DispatcherHandle,
    periodic: Option<JoinHandle<()>>,
}

impl RunHandle {
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.periodic.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.dispatcher.shutdown().await;
    }
}
