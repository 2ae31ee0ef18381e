//! Bounded notification queue with drop-oldest overflow.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::catalog::FileRecord;

#[derive(Debug, PartialEq)]
pub(crate) enum PushOutcome {
    Queued,
    /// Queue was full; the oldest entry was evicted to make room.
    DroppedOldest,
    Closed,
}

struct QueueState {
    items: VecDeque<FileRecord>,
    capacity: usize,
    closed: bool,
}

/// Single-consumer queue. Pushes never block.
pub(crate) struct NotificationQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                capacity: capacity.max(1),
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, record: FileRecord) -> PushOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            let outcome = if state.items.len() >= state.capacity {
                state.items.pop_front();
                PushOutcome::DroppedOldest
            } else {
                PushOutcome::Queued
            };
            state.items.push_back(record);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next entry. `None` once the queue is closed.
    pub async fn pop(&self) -> Option<FileRecord> {
        loop {
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(record) = state.items.pop_front() {
                    return Some(record);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Change capacity, evicting the oldest entries if needed.
    /// Returns how many were evicted.
    pub fn set_capacity(&self, capacity: usize) -> usize {
        let mut state = self.lock();
        state.capacity = capacity.max(1);
        let excess = state.items.len().saturating_sub(state.capacity);
        state.items.drain(..excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }
}
