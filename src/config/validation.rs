use crate::config::types::{BrowserConfig, Config, GuardConfig, ScrapingConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser_config(&config.browser)?;
    validate_scraping_config(&config.scraping)?;
    validate_guard_config(&config.guard)?;
    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.viewport_width < 320 || config.viewport_height < 240 {
        return Err(ConfigError::Validation(format!(
            "viewport must be at least 320x240, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if config.timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 1000ms, got {}ms",
            config.timeout_ms
        )));
    }

    if let Some(path) = &config.executable_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "executable_path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_scraping_config(config: &ScrapingConfig) -> Result<(), ConfigError> {
    if config.max_scroll_attempts < 1 || config.max_scroll_attempts > 10_000 {
        return Err(ConfigError::Validation(format!(
            "max_scroll_attempts must be between 1 and 10000, got {}",
            config.max_scroll_attempts
        )));
    }

    if config.stall_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "stall_limit must be >= 1, got {}",
            config.stall_limit
        )));
    }

    if config.scroll_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "scroll_delay_ms must be <= 60000ms, got {}ms",
            config.scroll_delay_ms
        )));
    }

    Ok(())
}

fn validate_guard_config(config: &GuardConfig) -> Result<(), ConfigError> {
    if config.memory_limit_mb < 64 {
        return Err(ConfigError::Validation(format!(
            "memory_limit_mb must be >= 64, got {}",
            config.memory_limit_mb
        )));
    }

    if config.sample_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "sample_interval must be >= 1, got {}",
            config.sample_interval
        )));
    }

    Ok(())
}
