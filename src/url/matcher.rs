/// Checks if a host matches a scope pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact: `"a.test"` matches only `a.test`
/// 2. Wildcard: `"*.a.test"` matches `a.test` itself and every subdomain of it
///
/// Comparison is ASCII case-insensitive, since hosts are.
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::matches_host_pattern;
///
/// assert!(matches_host_pattern("a.test", "A.TEST"));
/// assert!(matches_host_pattern("*.a.test", "docs.a.test"));
/// assert!(!matches_host_pattern("*.a.test", "evil-a.test"));
/// ```
pub fn matches_host_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.ends_with(&format!(".{base}")),
        None => host == pattern,
    }
}
