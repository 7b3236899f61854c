use crate::config::types::{BrowserSettings, Config, QueueConfig, StorageConfig, WorkerConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser_settings(&config.browser)?;
    validate_worker_config(&config.worker)?;
    validate_storage_config(&config.storage)?;
    validate_queue_config(&config.queues)?;
    Ok(())
}

/// Validates browser configuration
fn validate_browser_settings(config: &BrowserSettings) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 1000ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.body_timeout_ms == 0 || config.render_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "body_timeout_ms and render_timeout_ms must be greater than zero".to_string(),
        ));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry".to_string(),
        ));
    }

    if let Some(ua) = config.user_agents.iter().find(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "user_agents cannot contain blank entries, got '{}'",
            ua
        )));
    }

    if let Some(executable) = &config.executable {
        if executable.trim().is_empty() {
            return Err(ConfigError::InvalidPath(
                "browser executable cannot be blank".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates worker pool configuration
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.max_link_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_link_attempts must be >= 1, got {}",
            config.max_link_attempts
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.lease_seconds < 10 {
        return Err(ConfigError::Validation(format!(
            "lease_seconds must be >= 10, got {}",
            config.lease_seconds
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::InvalidPath(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.upload_root.is_empty() {
        return Err(ConfigError::InvalidPath(
            "upload_root cannot be empty".to_string(),
        ));
    }

    if config.cache_ttl_days < 1 {
        return Err(ConfigError::Validation(format!(
            "cache_ttl_days must be >= 1, got {}",
            config.cache_ttl_days
        )));
    }

    Ok(())
}

/// Validates queue names
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    validate_queue_name(&config.jobs)?;
    validate_queue_name(&config.results)?;

    if config.jobs == config.results {
        return Err(ConfigError::Validation(format!(
            "jobs and results queues must differ, both are '{}'",
            config.jobs
        )));
    }

    Ok(())
}

/// Validates a single queue name: non-empty, alphanumeric plus '.', '-' and '_'
fn validate_queue_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "queue name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(ConfigError::Validation(format!(
            "queue name '{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            browser: BrowserSettings::default(),
            worker: WorkerConfig::default(),
            storage: StorageConfig {
                database_path: "./harvest.db".to_string(),
                upload_root: "./uploads".to_string(),
                cache_ttl_days: 30,
            },
            queues: QueueConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_invalid_concurrency() {
        let mut config = valid_config();
        config.worker.concurrency = 0;
        assert!(validate(&config).is_err());

        config.worker.concurrency = 65;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_max_link_attempts() {
        let mut config = valid_config();
        config.worker.max_link_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_user_agent_pool() {
        let mut config = valid_config();
        config.browser.user_agents.clear();
        assert!(validate(&config).is_err());

        config.browser.user_agents = vec!["  ".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_short_navigation_timeout() {
        let mut config = valid_config();
        config.browser.navigation_timeout_ms = 500;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_paths() {
        let mut config = valid_config();
        config.storage.upload_root = String::new();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_queue_names() {
        assert!(validate_queue_name("scraper.page.queue").is_ok());
        assert!(validate_queue_name("jobs_v2-eu").is_ok());
        assert!(validate_queue_name("").is_err());
        assert!(validate_queue_name("bad queue").is_err());

        let mut config = valid_config();
        config.queues.results = config.queues.jobs.clone();
        assert!(validate(&config).is_err());
    }
}
