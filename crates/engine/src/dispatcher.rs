// SPDX-License-Identifier: MIT

//! Dispatcher (§4.6): the single background activity that pops ids off the
//! queue and spawns a Driver for each.

use crate::driver::Driver;
use std::sync::Arc;
use tm_core::{Clock, Queue, TaskId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct Dispatcher<C> {
    queue: Arc<dyn Queue<TaskId>>,
    driver: Driver<C>,
    drivers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl<C: Clock + Send + Sync + 'static> Dispatcher<C> {
    pub fn new(queue: Arc<dyn Queue<TaskId>>, driver: Driver<C>) -> Self {
        Self {
            queue,
            driver,
            drivers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawns the pop loop as a background task and returns a handle that
    /// stops it (and every outstanding driver) on `shutdown` or `Drop`.
    pub fn run(self) -> DispatcherHandle {
        let drivers = self.drivers.clone();
        let loop_handle = tokio::spawn(async move {
            loop {
                let Some(id) = self.queue.get().await else {
                    break;
                };
                let driver = self.driver.clone();
                let handle = tokio::spawn(async move {
                    driver.drive(id).await;
                });
                let mut drivers = drivers.lock().await;
                drivers.retain(|h| !h.is_finished());
                drivers.push(handle);
            }
        });

        DispatcherHandle {
            loop_handle: Some(loop_handle),
            drivers: self.drivers,
        }
    }
}

/// Owns the dispatch loop and every driver it has spawned. Dropping it
/// aborts the loop without awaiting outstanding drivers; call `shutdown`
/// for a clean, awaited stop.
pub struct DispatcherHandle {
    loop_handle: Option<JoinHandle<()>>,
    drivers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DispatcherHandle {
    /// Stops the pop loop and aborts+awaits every outstanding driver.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.loop_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        let mut drivers = self.drivers.lock().await;
        for handle in drivers.drain(..) {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.loop_handle.take() {
            handle.abort();
        }
    }
}
