//! HTTP downloads of menu file candidates
//!
//! Candidate files are fetched over plain HTTP with the user agent of the page
//! they were found on, so the page itself stays on the menu document.

use crate::HarvestError;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// A fetched candidate file
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Content-Type header value, lowercased, without parameters
    pub content_type: Option<String>,

    /// Response body
    pub body: Vec<u8>,
}

impl DownloadedFile {
    /// Returns true if the Content-Type says PDF
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
    }

    /// Returns true if the Content-Type is any image type
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// Builds the HTTP client used for candidate downloads
///
/// No default user agent is set; every request carries the page's.
///
/// # Arguments
///
/// * `timeout` - Upper bound for one download
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads a URL
///
/// # Arguments
///
/// * `client` - The HTTP client
/// * `url` - Absolute URL of the candidate
/// * `user_agent` - User agent of the page the candidate was found on
///
/// # Returns
///
/// * `Ok(DownloadedFile)` - 2xx response with its body
/// * `Err(HarvestError::Http)` - Network failure
/// * `Err(HarvestError::DownloadStatus)` - Non-success status
pub async fn download(client: &Client, url: &Url, user_agent: &str) -> Result<DownloadedFile, HarvestError> {
    let response = client
        .get(url.as_str())
        .header(header::USER_AGENT, user_agent)
        .send()
        .await
        .map_err(|e| HarvestError::Http {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::DownloadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(normalize_content_type);

    let body = response.bytes().await.map_err(|e| HarvestError::Http {
        url: url.to_string(),
        source: e,
    })?;

    Ok(DownloadedFile {
        content_type,
        body: body.to_vec(),
    })
}

fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_content_type() {
        assert_eq!(normalize_content_type("Application/PDF"), "application/pdf");
        assert_eq!(normalize_content_type("image/jpeg; charset=binary"), "image/jpeg");
    }

    #[test]
    fn test_type_predicates() {
        let file = DownloadedFile {
            content_type: Some("image/png".into()),
            body: vec![],
        };
        assert!(file.is_image());
        assert!(!file.is_pdf());
    }

    #[tokio::test]
    async fn test_download_sends_page_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/karte.pdf"))
            .and(header_matcher("user-agent", "PageAgent/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"%PDF-1.4".to_vec())
                    .insert_header("content-type", "application/pdf"),
            )
            .mount(&server)
            .await;

        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/karte.pdf", server.uri())).unwrap();
        let file = download(&client, &url, "PageAgent/1.0").await.unwrap();

        assert!(file.is_pdf());
        assert_eq!(file.body, b"%PDF-1.4".to_vec());
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/missing.jpg", server.uri())).unwrap();
        let result = download(&client, &url, "PageAgent/1.0").await;

        assert!(matches!(
            result,
            Err(HarvestError::DownloadStatus { status: 404, .. })
        ));
    }
}
