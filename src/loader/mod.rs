//! Loader module for bulk page loading
//!
//! This module contains the core loading logic, including:
//! - Per-item state and the item pipeline
//! - Retry and timeout backoff policy
//! - Bounded-concurrency scheduling
//! - HTTP transport and HTML document parsing
//! - Hooks and aggregate statistics

mod document;
mod hooks;
mod item;
mod orchestrator;
pub mod retry;
pub mod scheduler;
mod stats;
mod transport;

pub use document::HtmlDocument;
pub use item::{ItemId, LoaderItem, UserData};
pub use orchestrator::{BulkHtmlLoader, QueueEntry};
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::{ConcurrencyLimit, Scheduler};
pub use stats::{LoadStats, Progress};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
