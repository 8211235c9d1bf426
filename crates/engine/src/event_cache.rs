// SPDX-License-Identifier: MIT

//! Topic-keyed event registry (§4.2).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tm_core::{Event, EventFactory};

pub struct EventCache {
    factory: Arc<dyn EventFactory>,
    events: Mutex<HashMap<String, Arc<dyn Event>>>,
    /// Serializes the create step of `get`'s get-or-create path. The map
    /// above stays behind a plain `std::sync::Mutex` so `delete`/`clear`
    /// remain synchronous, which `CacheEntryGuard`'s `Drop` impl relies on.
    creation: tokio::sync::Mutex<()>,
}

impl EventCache {
    pub fn new(factory: Arc<dyn EventFactory>) -> Self {
        Self {
            factory,
            events: Mutex::new(HashMap::new()),
            creation: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the event for `topic`, creating it via the factory on first
    /// use. The fast path is lock-free once an entry exists; the slow path
    /// holds `creation` across the factory call so two concurrent
    /// first-time lookups for the same topic can never hand back two
    /// different `Event`s, even when the factory itself does not dedup.
    pub async fn get(&self, topic: &str) -> Arc<dyn Event> {
        if let Some(event) = self.lock().get(topic).cloned() {
            return event;
        }
        let _serialize = self.creation.lock().await;
        if let Some(event) = self.lock().get(topic).cloned() {
            return event;
        }
        let event = self.factory.create(topic).await;
        self.lock().entry(topic.to_string()).or_insert(event).clone()
    }

    pub fn delete(&self, topic: &str) {
        self.lock().remove(topic);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn Event>>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn cancelled_topic(id: tm_core::TaskId) -> String {
    format!("cancelled:{id}")
}

pub fn finished_topic(id: tm_core::TaskId) -> String {
    format!("finished:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tm_adapters::NotifyEventFactory;

    #[tokio::test]
    async fn get_is_a_safe_get_or_create() {
        let cache = EventCache::new(Arc::new(NotifyEventFactory::new()));
        let a = cache.get("finished:1").await;
        let b = cache.get("finished:1").await;
        a.notify().await;
        b.wait().await;
    }

    #[tokio::test]
    async fn delete_drops_the_cached_event() {
        let cache = EventCache::new(Arc::new(NotifyEventFactory::new()));
        let a = cache.get("finished:1").await;
        a.notify().await;
        cache.delete("finished:1");
        let b = cache.get("finished:1").await;
        assert!(!Arc::ptr_eq(&a, &b));
    }

    /// A bare `tokio::sync::Notify` wrapper with no dedup of its own, unlike
    /// `NotifyEventFactory`, which hides the race this guards against.
    struct BareEvent {
        notify: tokio::sync::Notify,
    }

    #[async_trait]
    impl Event for BareEvent {
        async fn wait(&self) {
            self.notify.notified().await;
        }

        async fn notify(&self) {
            self.notify.notify_waiters();
        }
    }

    struct NonDedupingFactory {
        creations: AtomicUsize,
    }

    #[async_trait]
    impl EventFactory for NonDedupingFactory {
        async fn create(&self, _topic: &str) -> Arc<dyn Event> {
            self.creations.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Arc::new(BareEvent {
                notify: tokio::sync::Notify::new(),
            })
        }
    }

    #[tokio::test]
    async fn concurrent_first_lookups_create_only_one_event() {
        let factory = Arc::new(NonDedupingFactory {
            creations: AtomicUsize::new(0),
        });
        let cache = Arc::new(EventCache::new(factory.clone()));

        let (a, b) = tokio::join!(cache.get("finished:1"), cache.get("finished:1"));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.creations.load(Ordering::SeqCst), 1);
    }
}
