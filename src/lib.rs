//! Bulk HTML Loader: concurrent HTML page fetching with retries
//!
//! This crate loads a queue of URLs over HTTP(S) with a bounded number of
//! requests in flight, retries transient failures, parses each successful
//! body into a queryable HTML document and reports per-item and aggregate
//! outcomes through hooks.

pub mod config;
pub mod loader;
pub mod output;
pub mod state;
pub mod user_agent;

use std::time::Duration;
use thiserror::Error;

/// Main error type for loader operations
///
/// Every variant is a structural or programming error. Per-item network and
/// HTTP failures never surface here; they are recorded on the item as an
/// [`ItemError`].
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Queue must contain at least one item")]
    EmptyQueue,

    #[error("load can only be called once per loader instance; create a new loader to load another queue")]
    AlreadyLoaded,

    #[error("Item {url} has already been loaded (status: {status})")]
    ItemReused {
        url: String,
        status: state::ItemStatus,
    },

    #[error("Invalid state transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: state::ItemStatus,
        to: state::ItemStatus,
    },

    #[error("Completion for {url} reported twice")]
    DuplicateCompletion { url: String },

    #[error("{hook} handler for {expected} resolved with a different item ({actual})")]
    HandlerItemMismatch {
        hook: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Pipeline for {url} finished in non-terminal state {status}")]
    NotTerminal {
        url: String,
        status: state::ItemStatus,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Failure recorded on a single item
///
/// All three kinds are treated the same way by the retry policy; only the
/// recorded payload differs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("{status} {reason}")]
    Http { status: u16, reason: String },

    #[error("408 Request Timeout after {after:?}")]
    Timeout { after: Duration },

    #[error("{message}")]
    Network { message: String },
}

impl ItemError {
    /// Builds an HTTP error with the canonical reason phrase for `status`
    pub fn http(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
            .to_string();

        Self::Http { status, reason }
    }

    /// Numeric code of the failure, when it has one
    ///
    /// Timeouts report 408; network failures carry no status code.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { .. } => Some(408),
            Self::Network { .. } => None,
        }
    }

    /// Human readable description of the failure
    pub fn description(&self) -> &str {
        match self {
            Self::Http { reason, .. } => reason,
            Self::Timeout { .. } => "Request Timeout",
            Self::Network { message } => message,
        }
    }

    /// Returns true if the failure was caused by the per-attempt deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while querying a parsed document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, LoaderConfig};
pub use loader::{
    BulkHtmlLoader, HtmlDocument, HttpTransport, LoadStats, LoaderItem, Progress, QueueEntry,
    Transport, TransportError, TransportResponse,
};
pub use state::ItemStatus;
