//! Configuration module for Job-Harvest
//!
//! Settings come from an optional TOML file layered with `HARVEST_*`
//! environment variables, and are validated before any crawl starts.
//!
//! # Example
//!
//! ```no_run
//! use job_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("harvest.toml"))).unwrap();
//! println!("Harvesting {}", config.site.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, ServerConfig, SiteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_from,
    load_config_with_hash, ENV_PREFIX,
};
pub use validation::validate;
