//! URL handling for the listing site
//!
//! Builds listing page URLs, resolves job-card links against the site root
//! and canonicalizes detail URLs into deduplication keys.

mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

pub use normalize::canonicalize;

/// Parses and checks the configured site root
pub fn site_root(base_url: &str) -> UrlResult<Url> {
    let url = Url::parse(base_url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    check_http(&url)?;
    Ok(url)
}

/// Builds the URL of one listing page
///
/// `listing_path` may be a path relative to `root` or an absolute URL. Any
/// existing value of `page_param` is replaced.
///
/// # Examples
///
/// ```
/// use job_harvest::url::{listing_page_url, site_root};
///
/// let root = site_root("https://jobs.example.com").unwrap();
/// let url = listing_page_url(&root, "/list?cat=7", "page", 3).unwrap();
/// assert_eq!(url.as_str(), "https://jobs.example.com/list?cat=7&page=3");
/// ```
pub fn listing_page_url(root: &Url, listing_path: &str, page_param: &str, page: u32) -> UrlResult<Url> {
    let mut url = root
        .join(listing_path)
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    check_http(&url)?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != page_param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(page_param, &page.to_string());

    Ok(url)
}

/// Resolves a job card's `href` into a canonical, absolute detail URL
pub fn resolve_detail_url(root: &Url, href: &str) -> UrlResult<Url> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Parse("empty href".to_string()));
    }

    let url = root.join(href).map_err(|e| UrlError::Parse(e.to_string()))?;
    check_http(&url)?;
    Ok(canonicalize(url))
}

fn check_http(url: &Url) -> UrlResult<()> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }
    Ok(())
}
