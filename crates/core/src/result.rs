// SPDX-License-Identifier: MIT

//! The typed result a [`crate::TaskId`] resolves to (§4.3).

use serde_json::Value as Json;

/// Outcome of a finished task, as returned by the Result Resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Cancelled,
    Failed { error: String },
    Completed { result: Json },
}
