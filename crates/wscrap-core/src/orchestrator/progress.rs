//! Completed-article counter with periodic milestone logging.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    processed: u64,
    milestones: u64,
}

/// Counts articles whose submission returned successfully.
///
/// A milestone is logged each time the count reaches a multiple of
/// `log_frequency` (0 disables milestones).
#[derive(Debug)]
pub struct ProgressCounter {
    tally: Mutex<Tally>,
    log_frequency: u64,
}

impl ProgressCounter {
    pub fn new(log_frequency: u64) -> Self {
        Self {
            tally: Mutex::new(Tally::default()),
            log_frequency,
        }
    }

    /// Count one completion; returns the new total.
    pub fn record(&self) -> u64 {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.processed += 1;
        if self.log_frequency > 0 && tally.processed % self.log_frequency == 0 {
            tally.milestones += 1;
            tracing::info!("Completed web scraping for {} articles", tally.processed);
        }
        tally.processed
    }

    pub fn processed(&self) -> u64 {
        self.tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .processed
    }

    /// Number of milestone lines logged so far.
    pub fn milestones(&self) -> u64 {
        self.tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .milestones
    }
}
