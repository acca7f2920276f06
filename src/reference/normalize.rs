use crate::ReferenceError;
use url::Url;

/// Query parameters that never identify a note and are dropped
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref"];

/// Normalizes a reference address so equal notes compare equal
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Lowercase the host (done by the URL parser)
/// 4. Collapse repeated slashes and drop a trailing slash (except for root)
/// 5. Remove the fragment
/// 6. Remove tracking query parameters (`utm_*` and friends)
/// 7. Sort the remaining query parameters by key; drop an empty query
///
/// Access tokens in the query survive normalization, so two addresses of the
/// same note with different tokens stay distinct.
///
/// # Examples
///
/// ```
/// use note_harvester::reference::normalize_reference;
///
/// let url = normalize_reference(" https://WWW.Example.com/explore/abc/?xsec_token=t#top ").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/explore/abc?xsec_token=t");
/// ```
pub fn normalize_reference(input: &str) -> Result<Url, ReferenceError> {
    let mut url = Url::parse(input.trim()).map_err(|e| ReferenceError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ReferenceError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ReferenceError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collapses empty segments and removes a trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
