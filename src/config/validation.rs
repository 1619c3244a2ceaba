use crate::config::types::{Config, CrawlerConfig, OutputConfig, SelectorConfig, SiteConfig, UserAgentConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_selectors(&config.selectors)?;
    validate_bind(&config.server.bind)?;
    Ok(())
}

/// Validates the target site settings
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.base_url.trim().is_empty() {
        return Err(ConfigError::Missing(
            "site.base-url (or HARVEST_BASE_URL)".to_string(),
        ));
    }

    let root = crate::url::site_root(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    crate::url::listing_page_url(&root, &config.listing_path, &config.page_param, 1)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-path: {}", e)))?;

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page-param cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Missing(
            "output.database-path (or HARVEST_DATABASE_PATH)".to_string(),
        ));
    }

    if matches!(&config.json_path, Some(path) if path.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "json-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Checks that every selector parses
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    let fields = [
        ("card", &config.card),
        ("badge", &config.badge),
        ("company", &config.company),
        ("title-link", &config.title_link),
        ("deadline", &config.deadline),
        ("work-place", &config.work_place),
        ("career", &config.career),
        ("education", &config.education),
        ("employment-type", &config.employment_type),
        ("salary", &config.salary),
        ("tag-container", &config.tag_container),
        ("tag", &config.tag),
        ("description", &config.description),
    ];

    for (field, selector) in fields {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                field: field.to_string(),
                selector: selector.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_bind(bind: &str) -> Result<(), ConfigError> {
    bind.parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|_| ConfigError::Validation(format!("Invalid server bind address: '{}'", bind)))
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
