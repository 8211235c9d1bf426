// SPDX-License-Identifier: MIT

//! The seven plugin interfaces (§6). All may suspend; all are expressed as
//! `async_trait` traits bounded `Send + Sync` so the engine can hold them as
//! `Arc<dyn Trait>` without committing to a concrete implementation.

use crate::FinishedTask;
use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

pub type DynError = Box<dyn StdError + Send + Sync>;

/// Supports getting and setting the single persisted state value. `T` is the
/// serialized `State` (§3). No atomicity beyond that of a single `set` is
/// required; all multi-step atomicity comes from the `Lock`.
#[async_trait]
pub trait Store<T>: Send + Sync {
    async fn get(&self) -> Result<T, DynError>;
    async fn set(&self, value: T) -> Result<(), DynError>;
}

/// Marker for the RAII guard returned by [`Lock::acquire`]; the lock is
/// released when the guard is dropped.
pub trait LockGuard: Send {}

/// Scoped acquisition of a re-entrancy-free exclusive lock, released on
/// every exit path including cancellation.
#[async_trait]
pub trait Lock: Send + Sync {
    async fn acquire(&self) -> Box<dyn LockGuard>;
}

/// FIFO queue of task ids. `get` blocks when empty and returns `None` once
/// the queue is closed (used to unwind the Dispatcher cleanly on shutdown).
/// `put` is unbounded for this design.
#[async_trait]
pub trait Queue<T: Send>: Send + Sync {
    async fn put(&self, item: T);
    async fn get(&self) -> Option<T>;
}

/// A level-triggered, notify-once signal. Once `notify` has been called,
/// every subsequent `wait` returns immediately.
#[async_trait]
pub trait Event: Send + Sync {
    async fn wait(&self);
    async fn notify(&self);
}

#[async_trait]
pub trait EventFactory: Send + Sync {
    async fn create(&self, topic: &str) -> Arc<dyn Event>;
}

/// The effectful computation a task performs.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn run(
        &self,
        parameters: &HashMap<String, Json>,
        dependencies: &HashMap<String, Json>,
    ) -> Result<Json, DynError>;
}

#[async_trait]
pub trait OperationFactory: Send + Sync {
    /// `None` indicates an unknown type.
    async fn create(&self, kind: &str) -> Option<Arc<dyn Operation>>;
}

/// A gate awaited before the operation runs.
#[async_trait]
pub trait Condition: Send + Sync {
    async fn wait(&self, parameters: &HashMap<String, Json>) -> Result<(), DynError>;
}

#[async_trait]
pub trait ConditionFactory: Send + Sync {
    /// `None` indicates an unknown type.
    async fn create(&self, kind: &str) -> Option<Arc<dyn Condition>>;
}

/// Decides whether a finished task is eligible for removal.
#[async_trait]
pub trait CleaningStrategy: Send + Sync {
    async fn evaluate(&self, task: &FinishedTask, parameters: &HashMap<String, Json>) -> bool;
}

#[async_trait]
pub trait CleaningStrategyFactory: Send + Sync {
    /// `None` indicates an unknown type.
    async fn create(&self, kind: &str) -> Option<Arc<dyn CleaningStrategy>>;
}
