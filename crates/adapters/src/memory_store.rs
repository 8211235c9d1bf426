// SPDX-License-Identifier: MIT

//! In-memory `Store<T>` reference adapter.

use async_trait::async_trait;
use tm_core::{DynError, Store};
use tokio::sync::Mutex;

pub struct MemoryStore<T> {
    inner: Mutex<T>,
}

impl<T> MemoryStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Store<T> for MemoryStore<T> {
    async fn get(&self) -> Result<T, DynError> {
        Ok(self.inner.lock().await.clone())
    }

    async fn set(&self, value: T) -> Result<(), DynError> {
        *self.inner.lock().await = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let store = MemoryStore::new(serde_json::json!({"a": 1}));
        assert_eq!(store.get().await.unwrap(), serde_json::json!({"a": 1}));
        store.set(serde_json::json!({"a": 2})).await.unwrap();
        assert_eq!(store.get().await.unwrap(), serde_json::json!({"a": 2}));
    }
}
