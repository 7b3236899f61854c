/// Checks if a hostname matches a host pattern
///
/// Three pattern forms are supported:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Domain suffix: "*.example.com" matches "example.com" and every subdomain
///    such as "img.example.com" or "a.b.example.com"
/// 3. Label prefix: a pattern ending in '.' such as "cdn." matches any host
///    containing that label, e.g. "cdn.example.com" or "static.cdn.example.net"
///
/// # Arguments
///
/// * `pattern` - The host pattern
/// * `host` - The lowercase hostname to check
///
/// # Examples
///
/// ```
/// use menu_harvest::url::matches_host_pattern;
///
/// assert!(matches_host_pattern("*.gstatic.com", "fonts.gstatic.com"));
/// assert!(matches_host_pattern("cdn.", "cdn.shop.example"));
/// assert!(!matches_host_pattern("cdn.", "mycdn.example"));
/// assert!(!matches_host_pattern("example.com", "www.example.com"));
/// ```
pub fn matches_host_pattern(pattern: &str, host: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{}", base))
    } else if pattern.ends_with('.') {
        host.starts_with(pattern) || host.contains(&format!(".{}", pattern))
    } else {
        host == pattern
    }
}

/// Returns true if the host matches at least one of the patterns
pub fn matches_any_host_pattern(patterns: &[&str], host: &str) -> bool {
    patterns.iter().any(|p| matches_host_pattern(p, host))
}
