//! Shared FIFO work queue with stop sentinels
//!
//! All jobs are enqueued before any worker starts, followed by one
//! [`WorkItem::Stop`] per worker. Each worker pops until it sees a sentinel,
//! so shutdown needs no separate broadcast. [`WorkQueue::join`] resolves once
//! every item, sentinels included, has been marked done.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem<T> {
    Job(T),
    Stop,
}

pub struct WorkQueue<T> {
    items: Mutex<VecDeque<WorkItem<T>>>,
    pending: AtomicUsize,
    drained: Notify,
}

impl<T> WorkQueue<T> {
    /// Builds a queue holding `jobs` followed by `workers` stop sentinels
    pub fn with_sentinels(jobs: impl IntoIterator<Item = T>, workers: usize) -> Self {
        let mut items: VecDeque<WorkItem<T>> = jobs.into_iter().map(WorkItem::Job).collect();
        items.extend((0..workers).map(|_| WorkItem::Stop));
        let pending = items.len();
        Self {
            items: Mutex::new(items),
            pending: AtomicUsize::new(pending),
            drained: Notify::new(),
        }
    }

    /// Takes the next item; an empty queue reads as a sentinel
    pub fn next(&self) -> WorkItem<T> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        match items.pop_front() {
            Some(item) => item,
            None => {
                // Nothing was taken, so nothing will be marked done for it
                self.pending.fetch_add(1, Ordering::SeqCst);
                WorkItem::Stop
            }
        }
    }

    /// Marks one taken item as processed
    pub fn task_done(&self) {
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        if previous <= 1 {
            self.drained.notify_waiters();
        }
    }

    /// Waits until every enqueued item has been processed
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Items not yet taken
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items taken or queued but not yet marked done
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
