//! Loader items
//!
//! A [`LoaderItem`] records one URL's load lifecycle: its status, attempt
//! and error counters, the current per-attempt deadline, the last error and,
//! once loaded, the parsed document. Items are created by the caller (or by
//! the loader from bare URL strings) and are mutated only by the loader's
//! per-item pipeline during a single run.

use crate::loader::HtmlDocument;
use crate::state::ItemStatus;
use crate::{ItemError, LoaderError};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

/// Arbitrary caller data attached to an item; never inspected by the loader
pub type UserData = Map<String, Value>;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique correlation id of an item
///
/// Used only to detect a completion being reported twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One URL and the state of its load
///
/// Cloning an item keeps its id, so a clone and its original are the same
/// item as far as completion tracking is concerned.
#[derive(Debug, Clone)]
pub struct LoaderItem {
    id: ItemId,
    url: String,
    user_data: UserData,
    status: ItemStatus,
    error: Option<ItemError>,
    result: Option<HtmlDocument>,
    timeout_budget: Duration,
    max_attempts: u32,
    attempts_made: u32,
    error_count: u32,
}

impl LoaderItem {
    /// Creates a pending item for `url`
    ///
    /// # Returns
    ///
    /// * `Ok(LoaderItem)` - The URL is an absolute http or https URL
    /// * `Err(LoaderError::InvalidUrl)` - Anything else
    ///
    /// # Example
    ///
    /// ```
    /// use bulk_html_loader::{ItemStatus, LoaderItem};
    ///
    /// let item = LoaderItem::new("https://example.com/").unwrap();
    /// assert_eq!(item.status(), ItemStatus::Pending);
    /// assert!(LoaderItem::new("example.com").is_err());
    /// ```
    pub fn new(url: impl Into<String>) -> Result<Self, LoaderError> {
        Self::with_data(url, UserData::new())
    }

    /// Creates a pending item carrying caller data
    pub fn with_data(url: impl Into<String>, user_data: UserData) -> Result<Self, LoaderError> {
        let url = url.into();
        validate_url(&url)?;

        Ok(Self {
            id: ItemId::next(),
            url,
            user_data,
            status: ItemStatus::Pending,
            error: None,
            result: None,
            timeout_budget: Duration::ZERO,
            max_attempts: 0,
            attempts_made: 0,
            error_count: 0,
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut UserData {
        &mut self.user_data
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// The last recorded failure; present only in `Warning` or `Error`
    pub fn error(&self) -> Option<&ItemError> {
        self.error.as_ref()
    }

    /// The parsed document; present only once the item is `Complete`
    pub fn result(&self) -> Option<&HtmlDocument> {
        self.result.as_ref()
    }

    /// Consumes the item and returns its parsed document
    pub fn into_result(self) -> Option<HtmlDocument> {
        self.result
    }

    /// Deadline applied to the next attempt
    pub fn timeout_budget(&self) -> Duration {
        self.timeout_budget
    }

    /// Total attempts allowed, copied from the loader when the run starts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Requests dispatched so far
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Failures recorded so far
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn has_more_attempts(&self) -> bool {
        self.attempts_made < self.max_attempts
    }

    /// Applies run settings before the first dispatch
    pub(crate) fn prepare(&mut self, timeout: Duration, max_attempts: u32) {
        self.timeout_budget = timeout;
        self.max_attempts = max_attempts;
    }

    /// Moves the item to `status`
    ///
    /// Entering `Open` counts an attempt. Entering any status other than
    /// `Warning` or `Error` clears the recorded error.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidTransition`] for a transition the state
    /// machine does not allow, including setting the current status again
    /// and leaving a terminal status.
    pub(crate) fn set_status(&mut self, status: ItemStatus) -> Result<(), LoaderError> {
        if !self.status.can_transition_to(status) {
            return Err(LoaderError::InvalidTransition {
                url: self.url.clone(),
                from: self.status,
                to: status,
            });
        }

        if !status.is_failure() {
            self.error = None;
        }

        if status == ItemStatus::Open {
            self.attempts_made += 1;
        }

        self.status = status;
        Ok(())
    }

    /// Records the failure of the current attempt
    pub(crate) fn record_error(&mut self, error: ItemError) {
        self.error = Some(error);
        self.error_count += 1;
    }

    pub(crate) fn set_result(&mut self, document: HtmlDocument) {
        debug_assert!(self.result.is_none(), "result already set for {}", self.url);
        self.result = Some(document);
    }

    pub(crate) fn increase_timeout(&mut self, by: Duration) {
        self.timeout_budget += by;
    }
}

impl fmt::Display for LoaderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(
                f,
                "[LoaderItem] {} {} {} {}",
                self.status,
                error
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                error.description(),
                self.url
            ),
            None => write!(f, "[LoaderItem] {} {}", self.status, self.url),
        }
    }
}

/// Checks that a URL is absolute and uses http or https
fn validate_url(url: &str) -> Result<(), LoaderError> {
    let invalid = |reason: String| LoaderError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(())
}
