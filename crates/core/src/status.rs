// SPDX-License-Identifier: MIT

//! Task status enum.

use serde::{Deserialize, Serialize};

/// Where a task currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Running,
    Cancelled,
    Failed,
    Completed,
}

impl Status {
    /// Finished / terminal per the glossary: cancelled, failed or completed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Cancelled | Status::Failed | Status::Completed)
    }
}

crate::simple_display! {
    Status {
        Pending => "pending",
        Running => "running",
        Cancelled => "cancelled",
        Failed => "failed",
        Completed => "completed",
    }
}
