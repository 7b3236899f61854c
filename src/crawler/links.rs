//! Same-host link discovery
//!
//! Every `<a href>` on the loaded page is resolved against the page URL.
//! Links to other hosts, special schemes and in-page anchors are dropped.

use crate::browser::Page;
use crate::url::same_host;
use crate::HarvestError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts the same-host links of a serialized document
///
/// # Arguments
///
/// * `html` - Serialized DOM of the page
/// * `page_url` - URL of the page, used as the base and for the host check
///
/// # Returns
///
/// Absolute URLs without fragments, deduplicated in document order
///
/// # Example
///
/// ```
/// use menu_harvest::crawler::discover_links;
/// use url::Url;
///
/// let html = r#"<a href="/karte">Karte</a><a href="https://other.com/">x</a>"#;
/// let base = Url::parse("https://pizzeria.de/").unwrap();
/// let links = discover_links(html, &base);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://pizzeria.de/karte");
/// ```
pub fn discover_links(html: &str, page_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, page_url) else {
            continue;
        };
        if !same_host(&url, page_url) {
            continue;
        }
        if seen.insert(url.to_string()) {
            links.push(url);
        }
    }

    links
}

/// Discovers the same-host links of the page currently loaded
pub async fn discover_page_links(page: &dyn Page, page_url: &Url) -> Result<Vec<Url>, HarvestError> {
    let html = page.content().await?;
    Ok(discover_links(&html, page_url))
}

/// Resolves a link href to an absolute http(s) URL without fragment
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Empty and fragment-only hrefs
/// - Invalid URLs and non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    Some(link_key(&absolute_url))
}

/// The form a URL is tracked under in the link state cache: parsed, without fragment
pub fn link_key(url: &Url) -> Url {
    let mut key = url.clone();
    key.set_fragment(None);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Browser, SnapshotBrowser};
    use std::time::Duration;

    fn base_url() -> Url {
        Url::parse("https://pizzeria.de/speisen/").unwrap()
    }

    fn discovered(html: &str) -> Vec<String> {
        discover_links(html, &base_url())
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_relative_links_resolved() {
        let html = r#"<a href="mittag">Mittag</a><a href="/kontakt">Kontakt</a>"#;
        assert_eq!(
            discovered(html),
            vec![
                "https://pizzeria.de/speisen/mittag",
                "https://pizzeria.de/kontakt"
            ]
        );
    }

    #[test]
    fn test_other_hosts_dropped() {
        let html = r#"
            <a href="https://www.pizzeria.de/karte">www</a>
            <a href="https://facebook.com/pizzeria">fb</a>
            <a href="http://pizzeria.de/getraenke">http</a>
        "#;
        assert_eq!(discovered(html), vec!["http://pizzeria.de/getraenke"]);
    }

    #[test]
    fn test_special_schemes_skipped() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="MAILTO:info@pizzeria.de">mail</a>
            <a href="tel:+4930123">call</a>
            <a href="data:text/html,hi">data</a>
            <a href="#top">top</a>
            <a href="   ">blank</a>
            <a href="ftp://pizzeria.de/file">ftp</a>
        "##;
        assert!(discovered(html).is_empty());
    }

    #[test]
    fn test_fragments_stripped_before_dedup() {
        let html = r##"
            <a href="/karte#pizza">Pizza</a>
            <a href="/karte#pasta">Pasta</a>
            <a href="/karte">Karte</a>
            <a href="/impressum">Impressum</a>
            <a href="/karte">Karte again</a>
        "##;
        assert_eq!(
            discovered(html),
            vec!["https://pizzeria.de/karte", "https://pizzeria.de/impressum"]
        );
    }

    #[test]
    fn test_query_strings_kept_distinct() {
        let html = r#"<a href="/karte?lang=de">de</a><a href="/karte?lang=en">en</a>"#;
        assert_eq!(discovered(html).len(), 2);
    }

    #[test]
    fn test_link_key_matches_discovered_form() {
        let job_url = Url::parse("https://pizzeria.de#top").unwrap();
        assert_eq!(link_key(&job_url).as_str(), "https://pizzeria.de/");

        let discovered = discover_links(r#"<a href="https://pizzeria.de">Home</a>"#, &base_url());
        assert_eq!(discovered, vec![link_key(&job_url)]);
    }

    #[tokio::test]
    async fn test_discover_page_links() {
        let browser = SnapshotBrowser::new().with_page(
            "https://pizzeria.de/speisen/",
            r#"<html><body><a href="/karte">Karte</a></body></html>"#,
        );
        let page = browser.open_page().await.unwrap();
        page.goto("https://pizzeria.de/speisen/", Duration::from_secs(1))
            .await
            .unwrap();

        let links = discover_page_links(page.as_ref(), &base_url()).await.unwrap();
        assert_eq!(links, vec![Url::parse("https://pizzeria.de/karte").unwrap()]);
    }
}
