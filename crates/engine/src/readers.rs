// SPDX-License-Identifier: MIT

//! Readers (§4.8): lock-scoped, read-only views over the persisted state.

use std::sync::Arc;
use tm_core::{
    CancelledRecord, CompletedRecord, FailedRecord, GenericTask, Lock, PendingRecord,
    RunningRecord, TaskId, TaskIndex,
};
use tm_storage::Modifier;

pub struct Readers {
    modifier: Arc<Modifier>,
    lock: Arc<dyn Lock>,
}

impl Readers {
    pub fn new(modifier: Arc<Modifier>, lock: Arc<dyn Lock>) -> Self {
        Self { modifier, lock }
    }

    pub async fn pending(&self, id: TaskId) -> Result<Option<PendingRecord>, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(state.tasks.pending.get(&id).cloned())
    }

    pub async fn running(&self, id: TaskId) -> Result<Option<RunningRecord>, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(state.tasks.running.get(&id).cloned())
    }

    pub async fn cancelled(&self, id: TaskId) -> Result<Option<CancelledRecord>, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(state.tasks.cancelled.get(&id).cloned())
    }

    pub async fn failed(&self, id: TaskId) -> Result<Option<FailedRecord>, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(state.tasks.failed.get(&id).cloned())
    }

    pub async fn completed(&self, id: TaskId) -> Result<Option<CompletedRecord>, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(state.tasks.completed.get(&id).cloned())
    }

    /// The public view of `id`, whatever its current status, or `None` if
    /// unknown.
    pub async fn get(&self, id: TaskId) -> Result<Option<GenericTask>, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(state.generic_task(id))
    }

    /// Ids grouped by status.
    pub async fn list(&self) -> Result<TaskIndex, tm_core::ModifierError> {
        let state = self.snapshot().await?;
        Ok(TaskIndex {
            pending: state.tasks.pending.keys().copied().collect(),
            running: state.tasks.running.keys().copied().collect(),
            cancelled: state.tasks.cancelled.keys().copied().collect(),
            failed: state.tasks.failed.keys().copied().collect(),
            completed: state.tasks.completed.keys().copied().collect(),
        })
    }

    async fn snapshot(&self) -> Result<tm_core::State, tm_core::ModifierError> {
        let _guard = self.lock.acquire().await;
        self.modifier.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use tm_adapters::{MemoryStore, TokioLock};
    use tm_core::{Specification, State};

    #[tokio::test]
    async fn list_groups_ids_by_status() {
        let initial = serde_json::to_value(State::default()).expect("serialize");
        let modifier = Arc::new(Modifier::new(Arc::new(MemoryStore::new(initial))));
        let lock: Arc<dyn Lock> = Arc::new(TokioLock::new());
        let id = TaskId::new();
        modifier
            .add_pending(id, Specification::new("noop", HashMap::new()), Specification::new("always", HashMap::new()), HashMap::new(), Utc::now())
            .await
            .unwrap();

        let readers = Readers::new(modifier, lock);
        let index = readers.list().await.unwrap();
        assert_eq!(index.pending, std::collections::HashSet::from([id]));
        assert_eq!(readers.get(id).await.unwrap().map(|t| t.status), Some(tm_core::Status::Pending));
    }
}
