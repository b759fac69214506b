//! Output module for reporting load results
//!
//! This module handles:
//! - Aggregating a finished result collection into a summary
//! - Printing per-item lines and the summary

pub mod stats;

pub use stats::{print_summary, LoadSummary};

use crate::loader::LoaderItem;
use crate::DocumentError;

/// Formats one result line for an item
///
/// Complete items show the page title, or the first match of `selector`
/// when one is given; failed items show their error.
///
/// # Arguments
///
/// * `item` - An item returned by a load
/// * `selector` - Optional CSS selector to extract from the document
///
/// # Returns
///
/// * `Ok(String)` - The formatted line
/// * `Err(DocumentError)` - The selector is not valid CSS
pub fn format_item(item: &LoaderItem, selector: Option<&str>) -> Result<String, DocumentError> {
    let Some(document) = item.result() else {
        return Ok(item.to_string());
    };

    let extracted = match selector {
        Some(selector) => document.select_text(selector)?.into_iter().next(),
        None => document.title(),
    };

    Ok(match extracted {
        Some(text) => format!("{} \"{}\"", item, text),
        None => item.to_string(),
    })
}
