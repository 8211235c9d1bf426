// SPDX-License-Identifier: MIT

//! `tokio::sync::Mutex`-backed `Lock` reference adapter.

use async_trait::async_trait;
use std::sync::Arc;
use tm_core::{Lock, LockGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct TokioLock {
    inner: Arc<Mutex<()>>,
}

impl TokioLock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(())),
        }
    }
}

struct TokioLockGuard(#[allow(dead_code)] OwnedMutexGuard<()>);

impl LockGuard for TokioLockGuard {}

#[async_trait]
impl Lock for TokioLock {
    async fn acquire(&self) -> Box<dyn LockGuard> {
        let guard = self.inner.clone().lock_owned().await;
        Box::new(TokioLockGuard(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_release_lets_next_acquire_through() {
        let lock = TokioLock::new();
        let guard = lock.acquire().await;
        drop(guard);
        let _second = lock.acquire().await;
    }

    #[tokio::test]
    async fn second_acquire_waits_for_first_to_drop() {
        let lock = TokioLock::new();
        let guard = lock.acquire().await;
        let lock2 = lock.clone();
        let handle = tokio::spawn(async move {
            let _g = lock2.acquire().await;
        });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }
}
