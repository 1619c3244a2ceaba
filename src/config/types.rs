use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Job-Harvest
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// The listing site being harvested
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Site root; relative detail links are resolved against it
    #[serde(rename = "base-url", default)]
    pub base_url: String,

    /// Path (or absolute URL) of the paginated listing page
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Job group code stamped onto every harvested listing
    #[serde(rename = "job-group", default = "default_job_group")]
    pub job_group: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            listing_path: default_listing_path(),
            page_param: default_page_param(),
            job_group: default_job_group(),
        }
    }
}

/// Crawl pacing and limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Maximum number of new listings saved per run
    #[serde(rename = "max-jobs", default = "default_max_jobs")]
    pub max_jobs: u32,

    /// Maximum number of listing pages fetched per run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Total attempts for one listing page before giving up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed back-off between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Fixed pause between listing page fetches (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            max_pages: default_max_pages(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = self
            .contact_url
            .iter()
            .map(|url| format!("+{}", url))
            .chain(self.contact_email.iter().cloned())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            contact_email: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: String,

    /// Optional JSON dump of each run's saved listings
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,
}

/// CSS selectors describing the listing site's markup
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    pub card: String,
    pub badge: String,
    pub company: String,
    pub title_link: String,
    pub deadline: String,
    pub work_place: String,
    pub career: String,
    pub education: String,
    pub employment_type: String,
    pub salary: String,
    pub tag_container: String,
    pub tag: String,
    pub description: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            card: ".item_recruit".to_string(),
            badge: ".badge".to_string(),
            company: ".corp_name a".to_string(),
            title_link: ".job_tit a".to_string(),
            deadline: ".date".to_string(),
            work_place: ".work_place".to_string(),
            career: ".career".to_string(),
            education: ".education".to_string(),
            employment_type: ".employment_type".to_string(),
            salary: ".salary".to_string(),
            tag_container: ".job_sector".to_string(),
            tag: "span".to_string(),
            description: ".job_summary".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the API listens on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_listing_path() -> String {
    "/zf_user/jobs/list/job-category".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_job_group() -> String {
    "91,92".to_string()
}

fn default_max_jobs() -> u32 {
    50
}

fn default_max_pages() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_crawler_name() -> String {
    "JobHarvest".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
