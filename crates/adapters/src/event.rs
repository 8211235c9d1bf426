// SPDX-License-Identifier: MIT

//! `tokio::sync::Notify`-backed `Event`/`EventFactory` reference adapter.
//!
//! `Notify::notify_waiters` only wakes tasks already waiting at the moment
//! it is called, so a plain `Notify` is edge-triggered. Pairing it with a
//! `fired` flag gives level-triggered semantics: `wait` registers interest
//! *before* checking the flag, so a `notify` that lands between the check
//! and the await is never missed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tm_core::{Event, EventFactory};
use tokio::sync::Notify;

struct NotifyEvent {
    notify: Notify,
    fired: AtomicBool,
}

#[async_trait]
impl Event for NotifyEvent {
    async fn wait(&self) {
        let notified = self.notify.notified();
        if self.fired.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    async fn notify(&self) {
        self.fired.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

/// Creates a fresh `NotifyEvent` per distinct topic and hands back the same
/// one on repeat lookups, serialized through an internal mutex.
#[derive(Default)]
pub struct NotifyEventFactory {
    events: Mutex<HashMap<String, Arc<dyn Event>>>,
}

impl NotifyEventFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventFactory for NotifyEventFactory {
    async fn create(&self, topic: &str) -> Arc<dyn Event> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .entry(topic.to_string())
            .or_insert_with(|| {
                Arc::new(NotifyEvent {
                    notify: Notify::new(),
                    fired: AtomicBool::new(false),
                })
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_after_notify() {
        let factory = NotifyEventFactory::new();
        let event = factory.create("finished:1").await;
        event.notify().await;
        event.wait().await;
    }

    #[tokio::test]
    async fn wait_unblocks_when_notified_concurrently() {
        let factory = NotifyEventFactory::new();
        let event = factory.create("finished:1").await;
        let waiter = {
            let event = event.clone();
            tokio::spawn(async move { event.wait().await })
        };
        tokio::task::yield_now().await;
        event.notify().await;
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn same_topic_returns_the_same_event() {
        let factory = NotifyEventFactory::new();
        let a = factory.create("cancelled:1").await;
        a.notify().await;
        let b = factory.create("cancelled:1").await;
        b.wait().await;
    }
}
