//! Detail page fetching
//!
//! Each new listing gets one GET of its detail page to fill in the free-text
//! description. Failures never propagate: a listing without a description is
//! still worth saving.

use crate::config::Config;
use crate::crawler::fetcher::fetch_text;
use crate::ConfigError;
use reqwest::Client;
use scraper::{Html, Selector};

/// Fetches and extracts listing descriptions
pub struct DetailFetcher {
    client: Client,
    selector: Selector,
}

impl DetailFetcher {
    pub fn new(client: Client, config: &Config) -> Result<Self, ConfigError> {
        let raw = &config.selectors.description;
        let selector = Selector::parse(raw).map_err(|_| ConfigError::InvalidSelector {
            field: "description".to_string(),
            selector: raw.clone(),
        })?;

        Ok(Self { client, selector })
    }

    /// Returns the description at `url`, or `""` on any failure
    pub async fn fetch_description(&self, url: &str) -> String {
        match fetch_text(&self.client, url).await {
            Ok(body) => {
                let description = extract_description(&body, &self.selector);
                if description.is_empty() {
                    tracing::debug!("No description block at {}", url);
                }
                description
            }
            Err(e) => {
                tracing::warn!("Detail fetch failed, saving without description: {}", e);
                String::new()
            }
        }
    }
}

/// Trimmed text of the first element matching `selector`
pub fn extract_description(html: &str, selector: &Selector) -> String {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|block| block.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
