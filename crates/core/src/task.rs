// SPDX-License-Identifier: MIT

//! Task, Specification and the per-status lifecycle records (§3).

use crate::{Status, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::{HashMap, HashSet};

/// Generic `{type, parameters}` shape shared by operations, conditions and
/// cleaning strategies. `type` is a registry key; `parameters` is opaque to
/// the engine and passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: HashMap<String, Json>,
}

impl Specification {
    pub fn new(kind: impl Into<String>, parameters: HashMap<String, Json>) -> Self {
        Self {
            kind: kind.into(),
            parameters,
        }
    }
}

/// Immutable core of a task: what to run, what gates it, and named upstream
/// results it needs. Carries its own id so records built from it are
/// self-contained (the id is also the key under which records are stored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub operation: Specification,
    pub condition: Specification,
    #[serde(default)]
    pub dependencies: HashMap<String, TaskId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub task: Task,
    #[serde(with = "crate::timestamp")]
    pub scheduled: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningRecord {
    pub task: Task,
    #[serde(with = "crate::timestamp")]
    pub scheduled: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub started: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelledRecord {
    pub task: Task,
    #[serde(with = "crate::timestamp")]
    pub scheduled: DateTime<Utc>,
    #[serde(with = "crate::timestamp::option")]
    pub started: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub cancelled: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub task: Task,
    #[serde(with = "crate::timestamp")]
    pub scheduled: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub started: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub failed: DateTime<Utc>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRecord {
    pub task: Task,
    #[serde(with = "crate::timestamp")]
    pub scheduled: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub started: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub completed: DateTime<Utc>,
    pub result: Json,
}

/// A finished (terminal) task record, as handed to a `CleaningStrategy`.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishedTask {
    Cancelled(CancelledRecord),
    Failed(FailedRecord),
    Completed(CompletedRecord),
}

impl FinishedTask {
    pub fn task(&self) -> &Task {
        match self {
            FinishedTask::Cancelled(r) => &r.task,
            FinishedTask::Failed(r) => &r.task,
            FinishedTask::Completed(r) => &r.task,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            FinishedTask::Cancelled(_) => Status::Cancelled,
            FinishedTask::Failed(_) => Status::Failed,
            FinishedTask::Completed(_) => Status::Completed,
        }
    }
}

/// A task of any status, with the status tagged alongside its core data.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericTask {
    pub task: Task,
    pub status: Status,
}

/// Ids grouped by status, as returned by the aggregate reader's `list()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskIndex {
    pub pending: HashSet<TaskId>,
    pub running: HashSet<TaskId>,
    pub cancelled: HashSet<TaskId>,
    pub failed: HashSet<TaskId>,
    pub completed: HashSet<TaskId>,
}

/// Result of a `clean` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningResult {
    pub removed: HashSet<TaskId>,
}

/// Request to admit a new task.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub operation: Specification,
    pub condition: Specification,
    pub dependencies: HashMap<String, TaskId>,
}

/// Request to cancel a task.
#[derive(Debug, Clone, Copy)]
pub struct CancelRequest {
    pub id: TaskId,
}

/// Request to run an on-demand clean.
#[derive(Debug, Clone)]
pub struct CleanRequest {
    pub strategy: Specification,
}
