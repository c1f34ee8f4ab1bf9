//! Shared multi-producer / multi-consumer FIFO between submitters and workers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::completion::CompletionSignal;

pub(super) enum Entry<T> {
    Task(T, CompletionSignal),
    /// One per worker, pushed by `dispose`.
    Shutdown,
}

pub(super) struct TaskQueue<T> {
    entries: Mutex<VecDeque<Entry<T>>>,
    available: Condvar,
}

impl<T> TaskQueue<T> {
    pub(super) fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    pub(super) fn push(&self, entry: Entry<T>) {
        self.lock().push_back(entry);
        self.available.notify_one();
    }

    /// Blocks until an entry is available.
    pub(super) fn pop(&self) -> Entry<T> {
        let mut entries = self.lock();
        loop {
            if let Some(entry) = entries.pop_front() {
                return entry;
            }
            entries = self
                .available
                .wait(entries)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove every queued task (keeping shutdown sentinels) and return how
    /// many were removed. Their signals are dropped, so blocked submitters
    /// see `Abandoned`.
    pub(super) fn drain_tasks(&self) -> usize {
        let removed: Vec<Entry<T>> = {
            let mut entries = self.lock();
            let (tasks, kept): (Vec<_>, Vec<_>) = entries
                .drain(..)
                .partition(|e| matches!(e, Entry::Task(..)));
            entries.extend(kept);
            tasks
        };
        removed.len()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
