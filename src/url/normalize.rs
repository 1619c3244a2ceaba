use url::Url;

/// Query parameters that only track where a click came from
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Canonicalizes a job detail URL into its deduplication key
///
/// # Canonicalization Steps
///
/// 1. Remove the fragment
/// 2. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 3. Sort remaining query parameters by key (stable for equal keys)
/// 4. Drop an empty query string
///
/// Scheme, host and path are kept as-is so the key stays fetchable.
///
/// # Examples
///
/// ```
/// use job_harvest::url::canonicalize;
/// use url::Url;
///
/// let url = Url::parse("https://jobs.example.com/view?b=2&a=1&utm_source=x#top").unwrap();
/// assert_eq!(canonicalize(url).as_str(), "https://jobs.example.com/view?a=1&b=2");
/// ```
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
