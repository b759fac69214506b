//! Summary statistics for a finished load
//!
//! This module provides functionality for aggregating and displaying the
//! outcome of a load from its result collection.

use crate::loader::LoaderItem;
use crate::state::ItemStatus;
use std::collections::HashMap;

/// Load summary
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Number of items in the result collection
    pub total_items: usize,

    /// Count of items by terminal status
    pub items_by_status: HashMap<ItemStatus, usize>,

    /// Requests dispatched across all items
    pub total_attempts: u64,

    /// Items that needed more than one attempt
    pub retried_items: usize,

    /// Final failure of each errored item, keyed by code and description
    pub failure_summary: HashMap<String, usize>,

    /// URLs of the items that ended in error, in queue order
    pub failed_urls: Vec<String>,
}

impl LoadSummary {
    /// Aggregates a result collection
    ///
    /// # Arguments
    ///
    /// * `items` - Items returned by a load, in any state
    pub fn from_items(items: &[LoaderItem]) -> Self {
        let mut summary = Self {
            total_items: items.len(),
            ..Self::default()
        };

        for item in items {
            *summary.items_by_status.entry(item.status()).or_insert(0) += 1;
            summary.total_attempts += u64::from(item.attempts_made());

            if item.attempts_made() > 1 {
                summary.retried_items += 1;
            }

            if item.status() == ItemStatus::Error {
                summary.failed_urls.push(item.url().to_string());

                if let Some(error) = item.error() {
                    let key = match error.code() {
                        Some(code) => format!("{} {}", code, error.description()),
                        None => "network error".to_string(),
                    };
                    *summary.failure_summary.entry(key).or_insert(0) += 1;
                }
            }
        }

        summary
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.items_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of items that completed, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }

        self.count(ItemStatus::Complete) as f64 / self.total_items as f64 * 100.0
    }
}

/// Prints a summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &LoadSummary) {
    println!("=== Load Summary ===\n");

    println!("Overview:");
    println!("  Total items: {}", summary.total_items);
    println!("  Requests sent: {}", summary.total_attempts);
    println!("  Items retried: {}", summary.retried_items);
    println!();

    println!("Items by Status:");
    // Sort states by count (descending)
    let mut status_counts: Vec<_> = summary.items_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if summary.total_items > 0 {
            (*count as f64 / summary.total_items as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !summary.failure_summary.is_empty() {
        println!("Failure Summary:");
        let mut failure_counts: Vec<_> = summary.failure_summary.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (failure, count) in failure_counts {
            println!("  {}: {}", failure, count);
        }
        println!();
    }

    if !summary.failed_urls.is_empty() {
        println!("Failed URLs ({}):", summary.failed_urls.len());
        for url in &summary.failed_urls {
            println!("  - {}", url);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} items loaded)",
        summary.success_rate(),
        summary.count(ItemStatus::Complete),
        summary.total_items
    );
}
