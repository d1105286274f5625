//! Live counters and the final run summary.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters updated by workers while a run is in progress.
///
/// Shared behind an `Arc`; the binary polls it to drive the progress spinner.
#[derive(Debug, Default)]
pub struct CrawlStats {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    duplicates_skipped: AtomicUsize,
}

impl CrawlStats {
    /// Creates a stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Items whose download was started.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.attempted.load(Ordering::SeqCst)
    }

    /// Items downloaded (or already present) and indexed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Items that failed at placement, download or indexing.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Discovered items dropped as duplicates.
    #[must_use]
    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_attempted(&self) {
        self.attempted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_duplicates(&self, count: usize) {
        self.duplicates_skipped.fetch_add(count, Ordering::SeqCst);
    }

    /// Freezes the counters into a summary.
    #[must_use]
    pub fn summary(&self, cancelled: bool) -> CrawlSummary {
        CrawlSummary {
            attempted: self.attempted(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            duplicates_skipped: self.duplicates_skipped(),
            cancelled,
        }
    }
}

/// Outcome of a run. A run always ends with a summary, never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates_skipped: usize,
    pub cancelled: bool,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} files downloaded",
            self.succeeded, self.attempted
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.duplicates_skipped > 0 {
            write!(f, ", {} duplicates skipped", self.duplicates_skipped)?;
        }
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}
