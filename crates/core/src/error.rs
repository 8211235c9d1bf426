// SPDX-License-Identifier: MIT

//! Error kinds (§7). `SchedulerError` is what every public-facing call
//! (`Adder`, `Canceller`, `Reaper`) can fail with; `ModifierError` is the
//! narrower set the storage layer raises, plus store/serialization
//! failures, and maps onto `SchedulerError` at the facade boundary.

use crate::{Status, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModifierError {
    #[error("Dependency not found: {0}.")]
    DependencyNotFound(TaskId),

    #[error("Task not found: {0}.")]
    TaskNotFound(TaskId),

    #[error("Task {id} has invalid status: {status}.")]
    TaskStatusError { id: TaskId, status: Status },

    #[error("failed to serialize scheduler state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid operation: {0}.")]
    InvalidOperation(String),

    #[error("Invalid condition: {0}.")]
    InvalidCondition(String),

    #[error("Invalid cleaning strategy: {0}.")]
    InvalidCleaningStrategy(String),

    #[error("Dependency not found: {0}.")]
    DependencyNotFound(TaskId),

    #[error("Task not found: {0}.")]
    TaskNotFound(TaskId),

    #[error("Task {id} has invalid status: {status}.")]
    TaskStatusError { id: TaskId, status: Status },

    #[error("Dependency {id} finished with status {status}.")]
    UnsuccessfulDependency { id: TaskId, status: Status },

    #[error("Task {id} has unexpected status {status}.")]
    UnexpectedTaskStatus { id: TaskId, status: Status },

    #[error(transparent)]
    Modifier(ModifierError),
}

impl From<ModifierError> for SchedulerError {
    fn from(err: ModifierError) -> Self {
        match err {
            ModifierError::DependencyNotFound(id) => SchedulerError::DependencyNotFound(id),
            ModifierError::TaskNotFound(id) => SchedulerError::TaskNotFound(id),
            ModifierError::TaskStatusError { id, status } => {
                SchedulerError::TaskStatusError { id, status }
            }
            other => SchedulerError::Modifier(other),
        }
    }
}
