use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use telescroll::config::load_config;
///
/// let config = load_config(Path::new("telescroll.toml")).unwrap();
/// println!("Scroll delay: {}ms", config.scraping.scroll_delay_ms);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
///
/// The hash is the hex-encoded SHA-256 of the file, logged at startup so two
/// runs can be matched to the settings they used. The file is read once, so
/// the hash always describes the parsed content.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[browser]
headless = false
viewport-width = 1280
timeout-ms = 45000

[scraping]
scroll-delay-ms = 250
max-scroll-attempts = 80

[guard]
memory-limit-mb = 2048
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1280);
        assert_eq!(config.browser.viewport_height, 1080);
        assert_eq!(config.browser.timeout_ms, 45_000);
        assert_eq!(config.scraping.scroll_delay_ms, 250);
        assert_eq!(config.scraping.max_scroll_attempts, 80);
        assert_eq!(config.scraping.stall_limit, 3);
        assert_eq!(config.guard.memory_limit_mb, 2048);
        assert_eq!(config.guard.sample_interval, 10);
    }

    #[test]
    fn test_empty_config_is_default() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scraping.max_scroll_attempts, 50);
        assert_eq!(config.scraping.position_warmup, 5);
        assert_eq!(config.guard.memory_limit_mb, 1500);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/telescroll.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[scraping]\nstall-limit = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_config_hash_is_stable() {
        let file = create_temp_config("[scraping]\nstall-limit = 4\n");

        let (config, hash1) = load_config_with_hash(file.path()).unwrap();
        let (_, hash2) = load_config_with_hash(file.path()).unwrap();

        assert_eq!(config.scraping.stall_limit, 4);
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("[guard]\nsample-interval = 5\n");
        let file2 = create_temp_config("[guard]\nsample-interval = 6\n");

        let (_, hash1) = load_config_with_hash(file1.path()).unwrap();
        let (_, hash2) = load_config_with_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
