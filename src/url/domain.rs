use url::Url;

/// Extracts the hostname from a URL
///
/// The host portion of the URL is lowercased and returned without the port.
/// This is the key under which extraction strategies are cached and the
/// directory name under which harvested files are stored.
///
/// # Arguments
///
/// * `url` - The URL to extract the hostname from
///
/// # Returns
///
/// * `Some(String)` - The lowercase hostname
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use menu_harvest::url::extract_domain;
///
/// let url = Url::parse("https://Trattoria.example.com/speisekarte").unwrap();
/// assert_eq!(extract_domain(&url), Some("trattoria.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when both URLs carry the same hostname
///
/// Ports and schemes are ignored, so `http://a.com/x` and `https://a.com:8443/y`
/// are the same host. URLs without a host never match anything.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/menu").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_no_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(extract_domain(&url), None);
    }

    #[test]
    fn test_same_host_ignores_scheme_and_port() {
        let a = Url::parse("http://pizzeria.example.com/karte").unwrap();
        let b = Url::parse("https://PIZZERIA.example.com:8443/about").unwrap();
        assert!(same_host(&a, &b));
    }

    #[test]
    fn test_same_host_rejects_subdomains() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("https://www.example.com/").unwrap();
        assert!(!same_host(&a, &b));
    }

    #[test]
    fn test_same_host_without_host() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("mailto:info@example.com").unwrap();
        assert!(!same_host(&a, &b));
    }
}
