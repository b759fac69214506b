//! Configuration module for the bulk HTML loader
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every setting can also be applied through the fluent setters on
//! [`BulkHtmlLoader`](crate::BulkHtmlLoader).
//!
//! # Example
//!
//! ```no_run
//! use bulk_html_loader::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("loader.toml")).unwrap();
//! println!("Max connections: {}", config.loader.max_concurrent_connections);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, LoaderConfig, UserAgentConfig, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT,
    DEFAULT_MAX_RETRIES,
};

pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_loader_config, validate_user_agent_config};
