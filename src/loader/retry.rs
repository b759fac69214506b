//! Retry policy for failed load attempts
//!
//! Every failure kind (network error, HTTP status >= 400, per-attempt
//! timeout) is retried the same way while attempts remain; only the error
//! recorded on the item differs. Timeouts additionally grow the item's own
//! deadline before the next attempt.

use crate::loader::scheduler::ConcurrencyLimit;
use crate::loader::{LoaderItem, TransportError, TransportResponse};
use crate::ItemError;
use std::time::Duration;
use tracing::warn;

/// Lowest status code treated as a failure
const FIRST_ERROR_STATUS: u16 = 400;

/// Decision taken after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Mark the item as a warning and dispatch attempt number `attempt`
    Retry {
        /// Which attempt the retry will be (1-indexed)
        attempt: u32,
    },

    /// No attempts remain; the item ends in `Error`
    GiveUp,
}

/// How a single attempt ended
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Status below 400; the body should be parsed
    Success { body: String },

    /// Any kind of failure
    Failure(ItemError),
}

/// Classifies the result of one transport call
///
/// `None` means the per-attempt deadline of `budget` expired first
pub fn classify(
    result: Option<Result<TransportResponse, TransportError>>,
    budget: Duration,
) -> AttemptOutcome {
    match result {
        None => AttemptOutcome::Failure(ItemError::Timeout { after: budget }),
        Some(Err(e)) => AttemptOutcome::Failure(ItemError::Network {
            message: e.to_string(),
        }),
        Some(Ok(response)) if response.status >= FIRST_ERROR_STATUS => {
            AttemptOutcome::Failure(ItemError::http(response.status))
        }
        Some(Ok(response)) => AttemptOutcome::Success {
            body: response.body,
        },
    }
}

/// Retry and backoff settings applied to every item of a run
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    max_retries: u32,

    /// Added to an item's deadline after each timeout
    timeout_increment: Duration,

    /// Shrink the global concurrency limit on every terminal error
    reduce_connections_on_error: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout_increment: Duration) -> Self {
        Self {
            max_retries,
            timeout_increment,
            reduce_connections_on_error: false,
        }
    }

    /// Enables the one-way throttle-down on terminal errors
    pub fn with_reduce_connections_on_error(mut self, enabled: bool) -> Self {
        self.reduce_connections_on_error = enabled;
        self
    }

    /// Total attempts per item, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn timeout_increment(&self) -> Duration {
        self.timeout_increment
    }

    /// Decides what happens after the item's latest attempt failed
    pub fn decide(&self, item: &LoaderItem) -> RetryDecision {
        if item.has_more_attempts() {
            RetryDecision::Retry {
                attempt: item.attempts_made() + 1,
            }
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Grows the item's deadline when `failure` was a timeout
    ///
    /// Other failure kinds leave the deadline unchanged
    pub fn apply_backoff(&self, item: &mut LoaderItem, failure: &ItemError) {
        if failure.is_timeout() {
            item.increase_timeout(self.timeout_increment);
        }
    }

    /// Applies the optional throttle-down after a terminal error
    ///
    /// Returns the new limit when it changed. The limit never drops below
    /// one and is never raised again.
    pub fn throttle_on_error(&self, limit: &ConcurrencyLimit) -> Option<usize> {
        if !self.reduce_connections_on_error {
            return None;
        }

        let reduced = limit.shrink()?;
        warn!(max_connections = reduced, "reducing concurrency after terminal error");
        Some(reduced)
    }
}
