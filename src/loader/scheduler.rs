//! Concurrency scheduler for the load queue
//!
//! This module handles:
//! - Keeping at most `limit` item pipelines in flight
//! - Honoring limit changes made mid-run for subsequent dispatches
//! - Tracking completions and rejecting a completion reported twice
//! - Returning the items in queue order once every item is terminal
//!
//! Pipelines are polled from a single `FuturesUnordered` on the caller's
//! task, so many requests overlap on non-blocking I/O without spawning.

use crate::loader::item::ItemId;
use crate::loader::{LoadStats, LoaderItem};
use crate::LoaderError;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared, resizable concurrency ceiling
///
/// Cloning yields a handle to the same ceiling. The scheduler reads it
/// before every dispatch decision, so changes never interrupt work that is
/// already in flight.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimit(Arc<AtomicUsize>);

impl ConcurrencyLimit {
    /// Creates a limit; values below one are raised to one
    pub fn new(limit: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(limit.max(1))))
    }

    pub fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Replaces the limit; values below one are raised to one
    pub fn set(&self, limit: usize) {
        self.0.store(limit.max(1), Ordering::SeqCst);
    }

    /// Lowers the limit by one, never below one
    ///
    /// Returns the new limit, or `None` if it was already one.
    pub fn shrink(&self) -> Option<usize> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current > 1).then(|| current - 1)
            })
            .ok()
            .map(|previous| previous - 1)
    }
}

/// Records which items have completed during one run
struct CompletionTracker {
    seen: HashSet<ItemId>,
}

impl CompletionTracker {
    fn with_capacity(total: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(total),
        }
    }

    /// Accepts the first terminal completion of an item
    fn record(&mut self, item: &LoaderItem) -> Result<(), LoaderError> {
        if !item.status().is_terminal() {
            return Err(LoaderError::NotTerminal {
                url: item.url().to_string(),
                status: item.status(),
            });
        }

        if !self.seen.insert(item.id()) {
            return Err(LoaderError::DuplicateCompletion {
                url: item.url().to_string(),
            });
        }

        Ok(())
    }
}

/// Scheduler drives a queue of items through a per-item pipeline
pub struct Scheduler {
    /// Ceiling on pipelines in flight
    limit: ConcurrencyLimit,

    /// Run statistics (open connections, processed count)
    stats: Arc<LoadStats>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `limit` - Concurrency ceiling, possibly shared with a throttle
    /// * `stats` - Statistics updated as items are dispatched and completed
    pub fn new(limit: ConcurrencyLimit, stats: Arc<LoadStats>) -> Self {
        Self { limit, stats }
    }

    /// Runs every item through `pipeline` and returns them in queue order
    ///
    /// Items are dispatched in queue order while fewer than the current
    /// limit are in flight; they complete in whatever order their pipelines
    /// settle. The processed counter reaches the queue length exactly once,
    /// when the last item completes.
    ///
    /// # Errors
    ///
    /// A structural error from any pipeline, a pipeline that finishes in a
    /// non-terminal state, or an item completing twice aborts the run.
    pub async fn run<F, Fut>(
        &self,
        items: Vec<LoaderItem>,
        pipeline: F,
    ) -> Result<Vec<LoaderItem>, LoaderError>
    where
        F: Fn(LoaderItem) -> Fut,
        Fut: Future<Output = Result<LoaderItem, LoaderError>>,
    {
        let total = items.len();
        let mut slots: Vec<Option<LoaderItem>> = (0..total).map(|_| None).collect();
        let mut tracker = CompletionTracker::with_capacity(total);
        let mut queue = items.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.limit.current() {
                let Some((index, item)) = queue.next() else {
                    break;
                };

                tracing::trace!(index, url = item.url(), "dispatching item");
                self.stats.connection_opened();

                let pipeline_future = pipeline(item);
                in_flight.push(async move { (index, pipeline_future.await) });
            }

            let Some((index, outcome)) = in_flight.next().await else {
                break;
            };

            self.stats.connection_closed();

            let item = outcome?;
            tracker.record(&item)?;

            let processed = self.stats.increment_processed();
            tracing::trace!(index, processed, total, "item completed");

            slots[index] = Some(item);
        }

        let results: Vec<LoaderItem> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), total);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::HtmlDocument;
    use crate::state::ItemStatus;
    use std::time::Duration;

    fn queue(n: usize) -> Vec<LoaderItem> {
        (0..n)
            .map(|i| {
                let mut item = LoaderItem::new(format!("http://host{}.example.com/", i)).unwrap();
                item.prepare(Duration::from_secs(1), 1);
                item
            })
            .collect()
    }

    fn complete(mut item: LoaderItem) -> Result<LoaderItem, LoaderError> {
        item.set_status(ItemStatus::Open)?;
        item.set_result(HtmlDocument::parse("<p>ok</p>"));
        item.set_status(ItemStatus::Complete)?;
        Ok(item)
    }

    fn scheduler(limit: usize) -> Scheduler {
        Scheduler::new(ConcurrencyLimit::new(limit), Arc::new(LoadStats::new()))
    }

    #[test]
    fn test_limit_floor_is_one() {
        assert_eq!(ConcurrencyLimit::new(0).current(), 1);

        let limit = ConcurrencyLimit::new(3);
        limit.set(0);
        assert_eq!(limit.current(), 1);
    }

    #[test]
    fn test_shrink_is_shared_between_clones() {
        let limit = ConcurrencyLimit::new(3);
        let handle = limit.clone();

        assert_eq!(handle.shrink(), Some(2));
        assert_eq!(handle.shrink(), Some(1));
        assert_eq!(handle.shrink(), None);
        assert_eq!(limit.current(), 1);
    }

    #[tokio::test]
    async fn test_results_keep_queue_order() {
        let scheduler = scheduler(5);
        let items = queue(5);
        let urls: Vec<String> = items.iter().map(|i| i.url().to_string()).collect();

        // Later items finish first
        let delays: std::collections::HashMap<String, u64> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| (url.clone(), (5 - i as u64) * 10))
            .collect();

        let results = scheduler
            .run(items, |item| {
                let delay = Duration::from_millis(delays[item.url()]);
                async move {
                    tokio::time::sleep(delay).await;
                    complete(item)
                }
            })
            .await
            .unwrap();

        let result_urls: Vec<String> = results.iter().map(|i| i.url().to_string()).collect();
        assert_eq!(result_urls, urls);
        assert!(results.iter().all(|i| i.status() == ItemStatus::Complete));
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let stats = Arc::new(LoadStats::new());
        let scheduler = Scheduler::new(ConcurrencyLimit::new(2), Arc::clone(&stats));

        let results = scheduler
            .run(queue(6), |item| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                complete(item)
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(stats.peak_open_connections(), 2);
        assert_eq!(stats.open_connections(), 0);
        assert_eq!(stats.processed(), 6);
    }

    #[tokio::test]
    async fn test_limit_change_applies_to_later_dispatches() {
        let stats = Arc::new(LoadStats::new());
        let limit = ConcurrencyLimit::new(4);
        let scheduler = Scheduler::new(limit.clone(), Arc::clone(&stats));
        let throttle = limit.clone();

        let results = scheduler
            .run(queue(8), |item| {
                let throttle = throttle.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    throttle.set(1);
                    complete(item)
                }
            })
            .await
            .unwrap();

        // The first four were already in flight; nothing was aborted
        assert_eq!(results.len(), 8);
        assert_eq!(stats.peak_open_connections(), 4);
        assert_eq!(limit.current(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_completion_is_rejected() {
        let scheduler = scheduler(2);
        let mut items = queue(1);
        let clone = items[0].clone();
        items.push(clone);

        let result = scheduler.run(items, |item| async move { complete(item) }).await;

        assert!(matches!(
            result,
            Err(LoaderError::DuplicateCompletion { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_terminal_completion_is_rejected() {
        let scheduler = scheduler(1);

        let result = scheduler
            .run(queue(1), |mut item| async move {
                item.set_status(ItemStatus::Open)?;
                Ok::<_, LoaderError>(item)
            })
            .await;

        assert!(matches!(
            result,
            Err(LoaderError::NotTerminal {
                status: ItemStatus::Open,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_pipeline_error_aborts_run() {
        let scheduler = scheduler(1);

        let result = scheduler
            .run(queue(2), |mut item| async move {
                item.set_status(ItemStatus::Complete)?;
                Ok::<_, LoaderError>(item)
            })
            .await;

        assert!(matches!(
            result,
            Err(LoaderError::InvalidTransition { .. })
        ));
    }
}
