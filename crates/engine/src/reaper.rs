// SPDX-License-Identifier: MIT

//! Reaper (§4.7): removes finished tasks with no live dependents. The
//! `CleaningStrategy::evaluate` predicate runs with the lock released
//! (§5) — `Modifier::removal_candidates` / `remove_if_still_eligible`
//! split the read and the mutation on either side of that gap, so a task
//! that gained a dependent while the predicate ran is re-validated before
//! it is actually removed.

use std::collections::HashSet;
use std::sync::Arc;
use tm_core::{
    CleanRequest, CleaningResult, CleaningStrategy, CleaningStrategyFactory, Lock, SchedulerError,
    TaskId,
};
use tm_storage::Modifier;

#[derive(Clone)]
pub struct Reaper {
    modifier: Arc<Modifier>,
    lock: Arc<dyn Lock>,
    strategies: Arc<dyn CleaningStrategyFactory>,
}

impl Reaper {
    pub fn new(
        modifier: Arc<Modifier>,
        lock: Arc<dyn Lock>,
        strategies: Arc<dyn CleaningStrategyFactory>,
    ) -> Self {
        Self {
            modifier,
            lock,
            strategies,
        }
    }

    /// Runs a single fixed-point sweep with the strategy named by
    /// `request.strategy.type`.
    pub async fn clean(&self, request: CleanRequest) -> Result<CleaningResult, SchedulerError> {
        let Some(strategy) = self.strategies.create(&request.strategy.kind).await else {
            return Err(SchedulerError::InvalidCleaningStrategy(request.strategy.kind));
        };

        let mut removed = HashSet::new();
        loop {
            let pass = self.sweep_once(strategy.as_ref(), &request.strategy.parameters).await?;
            if pass.is_empty() {
                break;
            }
            removed.extend(pass);
        }

        Ok(CleaningResult { removed })
    }

    async fn sweep_once(
        &self,
        strategy: &dyn CleaningStrategy,
        parameters: &std::collections::HashMap<String, serde_json::Value>,
    ) -> Result<HashSet<TaskId>, SchedulerError> {
        let candidates = {
            let _guard = self.lock.acquire().await;
            self.modifier.removal_candidates().await?
        };

        let mut removed = HashSet::new();
        for candidate in candidates {
            if !strategy.evaluate(&candidate, parameters).await {
                continue;
            }
            let id = candidate.task().id;
            let _guard = self.lock.acquire().await;
            if self.modifier.remove_if_still_eligible(id).await? {
                removed.insert(id);
            }
        }
        Ok(removed)
    }
}
