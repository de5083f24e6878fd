use crate::UrlError;
use url::Url;

/// Schemes the crawler is willing to fetch
const CRAWLABLE_SCHEMES: &[&str] = &["http", "https"];

/// Resolves a hyperlink against the page it was found on
///
/// # Normalization Steps
///
/// 1. Resolve `href` relative to `base`; scheme, host and port are inherited
///    from `base` when `href` does not carry them
/// 2. Reject anything that is not `http` or `https` (`javascript:`,
///    `mailto:`, `ftp:`, ...)
/// 3. Remove the fragment (everything after #)
///
/// Malformed hrefs are skipped rather than reported: one broken anchor must
/// not spoil the extraction of the rest of the page.
///
/// # Arguments
///
/// * `base` - The URL of the page the link was found on (post-redirect)
/// * `href` - The raw `href` attribute value
///
/// # Returns
///
/// * `Some(Url)` - The absolute, fragment-free URL used as a Job Table key
/// * `None` - The link should be skipped
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("http://a.test/dir/page").unwrap();
/// let url = normalize_link(&base, "../other#top").unwrap();
/// assert_eq!(url.as_str(), "http://a.test/other");
///
/// assert!(normalize_link(&base, "mailto:someone@a.test").is_none());
/// ```
pub fn normalize_link(base: &Url, href: &str) -> Option<Url> {
    let mut url = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            tracing::trace!("Skipping malformed href {:?} on {}: {}", href, base, e);
            return None;
        }
    };

    if !is_crawlable_scheme(url.scheme()) {
        return None;
    }

    url.host_str()?;
    url.set_fragment(None);

    Some(url)
}

/// Parses a seed URL into the canonical form used as a Job Table key
///
/// Seeds must be absolute `http`/`https` URLs with a host. The fragment is
/// removed so that a seed and a discovered link to the same page share a key.
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::parse_seed;
///
/// let seed = parse_seed("http://a.test#intro").unwrap();
/// assert_eq!(seed.as_str(), "http://a.test/");
/// assert!(parse_seed("ftp://a.test/").is_err());
/// ```
pub fn parse_seed(seed: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(seed.trim()).map_err(|e| UrlError::Parse(format!("{seed}: {e}")))?;

    if !is_crawlable_scheme(url.scheme()) {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(seed.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

fn is_crawlable_scheme(scheme: &str) -> bool {
    CRAWLABLE_SCHEMES.contains(&scheme)
}
