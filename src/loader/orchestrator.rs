//! Bulk loader - orchestration of a whole load run
//!
//! This module ties the pieces of a run together:
//! - Configuration set through fluent setters before the run
//! - Hook registration
//! - Normalizing and validating the queue
//! - The per-item pipeline (request, classify, retry or finalize, hooks)
//! - Aggregate statistics and progress reporting

use crate::config::{
    validate, validate_loader_config, validate_user_agent_config, Config, LoaderConfig,
    UserAgentConfig,
};
use crate::loader::hooks::{HookKind, Hooks};
use crate::loader::retry::{self, AttemptOutcome, RetryDecision, RetryPolicy};
use crate::loader::scheduler::{ConcurrencyLimit, Scheduler};
use crate::loader::{HtmlDocument, HttpTransport, LoadStats, LoaderItem, Progress, Transport};
use crate::state::ItemStatus;
use crate::user_agent::UserAgentPool;
use crate::{LoaderError, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One entry of a load queue: a bare URL or a pre-built item
#[derive(Debug, Clone)]
pub enum QueueEntry {
    Url(String),
    Item(LoaderItem),
}

impl From<&str> for QueueEntry {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for QueueEntry {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<LoaderItem> for QueueEntry {
    fn from(item: LoaderItem) -> Self {
        Self::Item(item)
    }
}

impl QueueEntry {
    fn into_item(self) -> Result<LoaderItem> {
        match self {
            Self::Url(url) => LoaderItem::new(url),
            Self::Item(item) if item.status() != ItemStatus::Pending => {
                Err(LoaderError::ItemReused {
                    url: item.url().to_string(),
                    status: item.status(),
                })
            }
            Self::Item(item) => Ok(item),
        }
    }
}

/// Loads a queue of HTML pages with bounded concurrency
///
/// A loader runs exactly one queue. Configure it and register hooks with
/// the consuming setters, then call [`BulkHtmlLoader::load`].
///
/// # Example
///
/// ```no_run
/// use bulk_html_loader::BulkHtmlLoader;
/// use std::time::Duration;
///
/// # async fn run() -> bulk_html_loader::Result<()> {
/// let loader = BulkHtmlLoader::new()?
///     .max_concurrent_connections(4)
///     .http_timeout(Duration::from_secs(3))
///     .on_error(|item| async move {
///         eprintln!("{}", item);
///         item
///     });
///
/// let items = loader.load(["https://example.com/", "https://example.org/"]).await?;
/// for item in &items {
///     println!("{} {:?}", item.url(), item.result().and_then(|doc| doc.title()));
/// }
/// # Ok(())
/// # }
/// ```
pub struct BulkHtmlLoader {
    config: LoaderConfig,
    user_agent: UserAgentConfig,
    transport: Box<dyn Transport>,
    user_agents: UserAgentPool,
    hooks: Hooks,
    limit: ConcurrencyLimit,
    stats: Arc<LoadStats>,
    started: AtomicBool,
}

impl BulkHtmlLoader {
    /// Creates a loader with default settings and the reqwest transport
    ///
    /// # Returns
    ///
    /// * `Ok(BulkHtmlLoader)` - Loader ready to be configured
    /// * `Err(LoaderError)` - The HTTP client could not be built
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?))
    }

    /// Creates a loader with default settings over a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        let config = LoaderConfig::default();

        Self {
            limit: ConcurrencyLimit::new(config.max_concurrent_connections),
            config,
            user_agent: UserAgentConfig::default(),
            transport: Box::new(transport),
            user_agents: UserAgentPool::default(),
            hooks: Hooks::default(),
            stats: Arc::new(LoadStats::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Creates a loader from a parsed configuration file
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the HTTP client cannot be
    /// built.
    pub fn from_config(config: Config) -> Result<Self> {
        validate(&config)?;

        let Config { loader, user_agent } = config;
        let limit = loader.max_concurrent_connections;

        let mut this = Self::new()?.user_agents(user_agent.agents);
        this.config = loader;
        this.limit.set(limit);
        Ok(this)
    }

    // ===== Configuration =====

    /// Maximum number of requests in flight at once
    pub fn max_concurrent_connections(mut self, limit: usize) -> Self {
        self.config.max_concurrent_connections = limit;
        self.limit.set(limit);
        self
    }

    /// Deadline of a single attempt
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// Added to an item's deadline after each timed-out attempt
    pub fn timeout_increment(mut self, increment: Duration) -> Self {
        self.config.timeout_increment_ms = Some(duration_to_millis(increment));
        self
    }

    /// Extra attempts after the first one
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Lower the concurrency limit by one on every item that ends in error
    pub fn reduce_connections_on_error(mut self, enabled: bool) -> Self {
        self.config.reduce_connections_on_error = enabled;
        self
    }

    /// Log every request and resolution at info level instead of debug
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose = enabled;
        self
    }

    /// Replaces the built-in browser user-agent pool
    ///
    /// Agents are checked when `load` starts; one that cannot be sent as a
    /// header value fails the run with a configuration error.
    pub fn user_agents(mut self, agents: Vec<String>) -> Self {
        self.user_agents = UserAgentPool::new(agents.clone());
        self.user_agent = UserAgentConfig { agents };
        self
    }

    // ===== Hooks =====

    /// Called after a failed attempt that will be retried
    pub fn on_warning<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(LoaderItem) -> Fut + 'static,
        Fut: Future<Output = LoaderItem> + 'static,
    {
        self.hooks.set(HookKind::Warning, handler);
        self
    }

    /// Called once an item has used up its attempts
    pub fn on_error<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(LoaderItem) -> Fut + 'static,
        Fut: Future<Output = LoaderItem> + 'static,
    {
        self.hooks.set(HookKind::Error, handler);
        self
    }

    /// Called once an item has loaded and its body has been parsed
    pub fn on_item_load_complete<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(LoaderItem) -> Fut + 'static,
        Fut: Future<Output = LoaderItem> + 'static,
    {
        self.hooks.set(HookKind::ItemLoadComplete, handler);
        self
    }

    /// Called on every resolution (complete, warning or error), before the
    /// more specific hook and after the counters are updated
    pub fn on_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(&LoaderItem, &BulkHtmlLoader) + 'static,
    {
        self.hooks.set_change(handler);
        self
    }

    // ===== Accessors =====

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Shared handle to the run statistics
    pub fn stats(&self) -> Arc<LoadStats> {
        Arc::clone(&self.stats)
    }

    /// Current concurrency limit, after any throttle-down
    pub fn max_connections(&self) -> usize {
        self.limit.current()
    }

    pub fn progress(&self) -> Progress {
        self.stats.progress()
    }

    /// Progress formatted as `loaded/total`
    pub fn progress_string(&self) -> String {
        self.progress().to_string()
    }

    /// Percentage loaded, truncated to two decimals
    pub fn progress_percent(&self) -> f64 {
        self.progress().percent()
    }

    // ===== Run =====

    /// Loads every entry of `queue` and returns the items in queue order
    ///
    /// Entries may be URL strings, pre-built [`LoaderItem`]s, or a mix.
    /// Per-item failures never fail the run; inspect each item's status.
    ///
    /// # Errors
    ///
    /// * [`LoaderError::AlreadyLoaded`] - This loader has already run a queue
    /// * [`LoaderError::Config`] - The configuration is invalid
    /// * [`LoaderError::InvalidUrl`] - An entry is not an absolute http(s) URL
    /// * [`LoaderError::ItemReused`] - An item was loaded by a previous run
    /// * [`LoaderError::EmptyQueue`] - The queue has no entries
    /// * Any state-consistency error raised during the run
    pub async fn load<I>(&self, queue: I) -> Result<Vec<LoaderItem>>
    where
        I: IntoIterator,
        I::Item: Into<QueueEntry>,
    {
        if self.started.load(Ordering::SeqCst) {
            return Err(LoaderError::AlreadyLoaded);
        }

        validate_loader_config(&self.config)?;
        validate_user_agent_config(&self.user_agent)?;

        let mut items = queue
            .into_iter()
            .map(|entry| entry.into().into_item())
            .collect::<Result<Vec<_>>>()?;

        if items.is_empty() {
            return Err(LoaderError::EmptyQueue);
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(LoaderError::AlreadyLoaded);
        }

        for item in &mut items {
            item.prepare(self.config.http_timeout(), self.config.max_attempts());
        }

        let total = items.len();
        self.limit.set(self.config.max_concurrent_connections.min(total));
        self.stats.begin(total);

        let policy = RetryPolicy::new(self.config.max_retries, self.config.timeout_increment())
            .with_reduce_connections_on_error(self.config.reduce_connections_on_error);

        info!(
            total,
            max_connections = self.limit.current(),
            max_attempts = policy.max_attempts(),
            "Starting load"
        );

        let policy = &policy;
        let scheduler = Scheduler::new(self.limit.clone(), Arc::clone(&self.stats));
        let items = scheduler
            .run(items, move |item| self.load_item(item, policy))
            .await?;

        info!(
            success = self.stats.success(),
            warnings = self.stats.warnings(),
            errors = self.stats.errors(),
            "Load finished"
        );

        Ok(items)
    }

    /// Drives one item until it is complete or out of attempts
    async fn load_item(&self, mut item: LoaderItem, policy: &RetryPolicy) -> Result<LoaderItem> {
        loop {
            item.set_status(ItemStatus::Open)?;

            let budget = item.timeout_budget();
            self.trace(&item, budget);

            let response =
                tokio::time::timeout(budget, self.transport.fetch(item.url(), self.headers()))
                    .await
                    .ok();

            let failure = match retry::classify(response, budget) {
                AttemptOutcome::Success { body } => {
                    item.set_result(HtmlDocument::parse(&body));
                    item.set_status(ItemStatus::Complete)?;
                    self.stats.increment_success();
                    self.resolve(&item);
                    return self.hooks.dispatch(HookKind::ItemLoadComplete, item).await;
                }
                AttemptOutcome::Failure(failure) => failure,
            };

            policy.apply_backoff(&mut item, &failure);

            match policy.decide(&item) {
                RetryDecision::Retry { attempt } => {
                    item.set_status(ItemStatus::Warning)?;
                    item.record_error(failure);
                    self.stats.increment_warnings();
                    self.resolve(&item);
                    item = self.hooks.dispatch(HookKind::Warning, item).await?;
                    debug!(
                        url = item.url(),
                        attempt,
                        max_attempts = item.max_attempts(),
                        "Retrying"
                    );
                }
                RetryDecision::GiveUp => {
                    item.set_status(ItemStatus::Error)?;
                    item.record_error(failure);
                    policy.throttle_on_error(&self.limit);
                    self.stats.increment_errors();
                    self.resolve(&item);
                    return self.hooks.dispatch(HookKind::Error, item).await;
                }
            }
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        // Agents were validated when the run started
        if let Ok(value) = HeaderValue::from_str(self.user_agents.random()) {
            headers.insert(USER_AGENT, value);
        }
        headers
    }

    fn trace(&self, item: &LoaderItem, budget: Duration) {
        let timeout_ms = duration_to_millis(budget);
        if self.config.verbose {
            info!(url = item.url(), attempt = item.attempts_made(), timeout_ms, "Requesting");
        } else {
            debug!(url = item.url(), attempt = item.attempts_made(), timeout_ms, "Requesting");
        }
    }

    fn resolve(&self, item: &LoaderItem) {
        if self.config.verbose {
            info!("{} ({})", item, self);
        } else {
            debug!("{} ({})", item, self);
        }

        self.hooks.notify_change(item, self);
    }
}

impl fmt::Display for BulkHtmlLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[BulkHtmlLoader] progress: {}, success: {}, warnings: {}, errors: {}, open conn: {}, max conn: {}",
            self.progress(),
            self.stats.success(),
            self.stats.warnings(),
            self.stats.errors(),
            self.stats.open_connections(),
            self.limit.current()
        )
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
