use crate::config::types::{Config, LoaderConfig, UserAgentConfig};
use crate::ConfigError;
use reqwest::header::HeaderValue;

/// Upper bound for the concurrency limit
const MAX_CONCURRENT_CONNECTIONS: usize = 1000;

/// Upper bound for extra attempts per item
const MAX_RETRIES: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_loader_config(&config.loader)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates loader configuration
pub fn validate_loader_config(config: &LoaderConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_connections < 1
        || config.max_concurrent_connections > MAX_CONCURRENT_CONNECTIONS
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_connections must be between 1 and {}, got {}",
            MAX_CONCURRENT_CONNECTIONS, config.max_concurrent_connections
        )));
    }

    if config.http_timeout_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "http_timeout_ms must be >= 1ms, got {}ms",
            config.http_timeout_ms
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
///
/// Every agent must be non-blank and usable as a `User-Agent` header value.
pub fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    for (index, agent) in config.agents.iter().enumerate() {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "user agent #{} cannot be empty",
                index + 1
            )));
        }

        if HeaderValue::from_str(agent).is_err() {
            return Err(ConfigError::Validation(format!(
                "user agent #{} is not a valid header value: {:?}",
                index + 1,
                agent
            )));
        }
    }

    Ok(())
}
