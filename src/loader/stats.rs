//! Aggregate run statistics and progress reporting

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loaded/total pair returned by progress accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: usize,
    pub total: usize,
}

impl Progress {
    /// Percentage loaded, truncated (not rounded) to two decimals
    ///
    /// Returns 0 when nothing is loaded yet or the total is 0.
    pub fn percent(&self) -> f64 {
        if self.loaded == 0 || self.total == 0 {
            return 0.0;
        }

        // Hundredths of a percent, truncated in integer arithmetic
        let hundredths = self.loaded as u128 * 10_000 / self.total as u128;
        hundredths as f64 / 100.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.loaded, self.total)
    }
}

/// Counters shared by the scheduler, the pipeline and any hook that holds a
/// clone of the `Arc`
///
/// Updated with atomics so a snapshot can be read at any point of a run.
#[derive(Debug, Default)]
pub struct LoadStats {
    total: AtomicUsize,
    processed: AtomicUsize,
    success: AtomicUsize,
    warnings: AtomicUsize,
    errors: AtomicUsize,
    open_connections: AtomicUsize,
    peak_open_connections: AtomicUsize,
}

impl LoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Items that reached a terminal state
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn success(&self) -> usize {
        self.success.load(Ordering::SeqCst)
    }

    /// Failed attempts that were retried
    pub fn warnings(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }

    /// Items that ended in `Error`
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    /// Pipelines currently holding a concurrency slot
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Highest value `open_connections` reached during the run
    pub fn peak_open_connections(&self) -> usize {
        self.peak_open_connections.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            loaded: self.processed(),
            total: self.total(),
        }
    }

    pub(crate) fn begin(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub(crate) fn connection_opened(&self) {
        let open = self.open_connections.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open_connections.fetch_max(open, Ordering::SeqCst);
    }

    pub(crate) fn connection_closed(&self) {
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn increment_success(&self) {
        self.success.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_warnings(&self) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}
