//! One-shot completion handshake between a submitter and the worker that
//! runs its task.

use std::sync::mpsc;

use super::PoolError;

/// Create a pending handle: the signal travels with the task, the waiter
/// stays with the submitter.
pub fn completion_pair() -> (CompletionSignal, CompletionWaiter) {
    let (tx, rx) = mpsc::sync_channel(1);
    (CompletionSignal { tx }, CompletionWaiter { rx })
}

/// Worker side. `release` consumes the signal, so a handle can be released
/// at most once. Dropping it unreleased wakes the waiter with
/// [`PoolError::Abandoned`].
#[derive(Debug)]
pub struct CompletionSignal {
    tx: mpsc::SyncSender<()>,
}

impl CompletionSignal {
    pub fn release(self) {
        // The waiter may already be gone (submitter thread died); nothing to wake.
        let _ = self.tx.send(());
    }
}

/// Submitter side.
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: mpsc::Receiver<()>,
}

impl CompletionWaiter {
    /// Block until the signal is released or dropped.
    pub fn wait(self) -> Result<(), PoolError> {
        self.rx.recv().map_err(|_| PoolError::Abandoned)
    }
}
