// SPDX-License-Identifier: MIT

//! `tokio::sync::mpsc`-backed `Queue<T>` reference adapter.

use async_trait::async_trait;
use tm_core::Queue;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

pub struct MemoryQueue<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
}

impl<T> MemoryQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

}

impl<T> Default for MemoryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send> Queue<T> for MemoryQueue<T> {
    async fn put(&self, item: T) {
        // Unbounded per §6; a send failure only happens once every receiver
        // is gone, which only occurs after the queue itself is dropped.
        let _ = self.sender.send(item);
    }

    async fn get(&self) -> Option<T> {
        self.receiver.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let queue: MemoryQueue<u32> = MemoryQueue::new();
        queue.put(1).await;
        queue.put(2).await;
        assert_eq!(queue.get().await, Some(1));
        assert_eq!(queue.get().await, Some(2));
    }
}
