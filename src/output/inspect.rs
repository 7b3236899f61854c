//! Offline inspection of a saved page
//!
//! Runs selector inference, link discovery and candidate collection over an
//! HTML file without a browser, for tuning and debugging.

use crate::crawler::discover_links;
use crate::extract::file::{screen_url, Screening};
use crate::extract::selector::{extract_data, infer};
use crate::extract::collect_candidates;
use url::Url;

/// What the extractors would see on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionReport {
    pub page_url: Url,

    /// The inferred selector, if both probe groups were found
    pub selector: Option<String>,

    /// Probe texts the selector was anchored on
    pub anchors: Option<(String, String)>,

    /// Items the selector extracts
    pub items: Vec<String>,

    /// Same-host links that would be queued
    pub links: Vec<Url>,

    /// File candidates and their URL screening verdicts
    pub candidates: Vec<(Url, Screening)>,
}

/// Inspects a serialized document
pub fn inspect_html(html: &str, page_url: &Url) -> InspectionReport {
    let inference = infer(html);
    let selector = inference.as_ref().map(|i| i.selector.to_string());
    let anchors = inference
        .as_ref()
        .map(|i| (i.primary.anchor.clone(), i.secondary.anchor.clone()));
    let items = selector
        .as_deref()
        .map(|s| extract_data(html, s))
        .unwrap_or_default();

    let candidates = collect_candidates(html, page_url, &[])
        .into_iter()
        .map(|url| {
            let verdict = screen_url(&url);
            (url, verdict)
        })
        .collect();

    InspectionReport {
        page_url: page_url.clone(),
        selector,
        anchors,
        items,
        links: discover_links(html, page_url),
        candidates,
    }
}

/// Prints an inspection report to stdout
pub fn print_inspection(report: &InspectionReport) {
    println!("=== Inspection of {} ===\n", report.page_url);

    match (&report.selector, &report.anchors) {
        (Some(selector), Some((primary, secondary))) => {
            println!("Selector: {}", selector);
            println!("  anchored on \"{}\" and \"{}\"", primary, secondary);
            println!("Items ({}):", report.items.len());
            for item in &report.items {
                println!("  - {}", item);
            }
        }
        _ => println!("Selector: none (probe terms not found)"),
    }
    println!();

    println!("Links ({}):", report.links.len());
    for link in &report.links {
        println!("  - {}", link);
    }
    println!();

    println!("File candidates ({}):", report.candidates.len());
    for (url, verdict) in &report.candidates {
        let verdict = match verdict {
            Screening::Pdf => "pdf".to_string(),
            Screening::Inspect => "download to check".to_string(),
            Screening::Reject(reason) => format!("rejected: {}", reason),
        };
        println!("  - {} ({})", url, verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_html() {
        let html = r#"<html><body>
            <table><tr><td>Wasser</td></tr><tr><td>Cola</td></tr></table>
            <a href="/karte.pdf">PDF</a>
            <a href="/galerie">Galerie</a>
            <img src="/img/logo.png">
        </body></html>"#;
        let url = Url::parse("https://gasthaus.de/").unwrap();

        let report = inspect_html(html, &url);

        assert_eq!(report.selector.as_deref(), Some("table > tbody > tr > td"));
        assert_eq!(report.items, vec!["Wasser", "Cola"]);
        assert_eq!(report.links.len(), 2);
        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.candidates[0].1, Screening::Pdf);
        assert!(matches!(report.candidates[1].1, Screening::Reject(_)));
    }
}
