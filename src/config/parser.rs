use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "HARVEST_";

/// Loads the configuration from an optional TOML file plus the process environment
///
/// Settings are layered: built-in defaults, then the file (if given), then
/// `HARVEST_*` environment variables. The result is validated; a missing
/// base URL or database path is a fatal [`ConfigError`].
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use job_harvest::config::load_config;
///
/// let config = load_config(Some(Path::new("harvest.toml"))).unwrap();
/// println!("Max jobs: {}", config.crawler.max_jobs);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_from(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`], but reads overrides through `lookup` instead of the environment
pub fn load_config_from<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate(&config)?;

    Ok(config)
}

/// Applies `HARVEST_*` overrides on top of an already-loaded configuration
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|value| !value.trim().is_empty())
    };

    if let Some(value) = var("BASE_URL") {
        config.site.base_url = value;
    }
    if let Some(value) = var("LISTING_PATH") {
        config.site.listing_path = value;
    }
    if let Some(value) = var("DATABASE_PATH") {
        config.output.database_path = value;
    }
    if let Some(value) = var("JSON_PATH") {
        config.output.json_path = Some(value);
    }
    if let Some(value) = var("BIND") {
        config.server.bind = value;
    }
    if let Some(value) = var("MAX_JOBS") {
        config.crawler.max_jobs = parse_number("MAX_JOBS", &value)?;
    }
    if let Some(value) = var("MAX_PAGES") {
        config.crawler.max_pages = parse_number("MAX_PAGES", &value)?;
    }
    if let Some(value) = var("MAX_RETRIES") {
        config.crawler.max_retries = parse_number("MAX_RETRIES", &value)?;
    }
    if let Some(value) = var("RETRY_DELAY_MS") {
        config.crawler.retry_delay_ms = parse_number("RETRY_DELAY_MS", &value)?;
    }
    if let Some(value) = var("PAGE_DELAY_MS") {
        config.crawler.page_delay_ms = parse_number("PAGE_DELAY_MS", &value)?;
    }

    Ok(())
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::Validation(format!(
            "{}{} must be a non-negative integer, got '{}'",
            ENV_PREFIX, name, value
        ))
    })
}

/// Computes a SHA-256 hash of the effective configuration
///
/// Stored with every crawl run so runs made under different settings can be told apart.
pub fn compute_config_hash(config: &Config) -> Result<String, ConfigError> {
    let canonical = serde_json::to_vec(config)
        .map_err(|e| ConfigError::Validation(format!("Failed to serialize config: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(&config)?;
    Ok((config, hash))
}
