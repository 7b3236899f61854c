//! Per-hostname extraction strategy
//!
//! Once a method produced data for a host, the method and the resource it used
//! (e.g. the inferred CSS selector) are cached so later pages of the same host
//! skip the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extraction methods, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionMethod {
    /// Reserved hook for sites exposing a menu API
    ApiExtractor,

    /// DOM selector inference over the rendered page
    HtmlExtractor,

    /// Menu file (PDF/image) harvesting
    FileExtractor,
}

impl ExtractionMethod {
    /// The wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiExtractor => "apiExtractor",
            Self::HtmlExtractor => "htmlExtractor",
            Self::FileExtractor => "fileExtractor",
        }
    }

    /// Parses a method from its wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apiExtractor" => Some(Self::ApiExtractor),
            "htmlExtractor" => Some(Self::HtmlExtractor),
            "fileExtractor" => Some(Self::FileExtractor),
            _ => None,
        }
    }

    /// All methods in the order the pipeline tries them
    pub fn pipeline_order() -> [Self; 3] {
        [Self::ApiExtractor, Self::HtmlExtractor, Self::FileExtractor]
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The method that last produced data for a hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStrategy {
    pub method: ExtractionMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl ExtractionStrategy {
    pub fn new(method: ExtractionMethod, resource: Option<String>) -> Self {
        Self { method, resource }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        for method in ExtractionMethod::pipeline_order() {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            assert_eq!(ExtractionMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(ExtractionMethod::parse("pdfExtractor"), None);
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(
            ExtractionMethod::pipeline_order(),
            [
                ExtractionMethod::ApiExtractor,
                ExtractionMethod::HtmlExtractor,
                ExtractionMethod::FileExtractor
            ]
        );
    }

    #[test]
    fn test_strategy_shape() {
        let strategy = ExtractionStrategy::new(
            ExtractionMethod::HtmlExtractor,
            Some(".menu-list > li".to_string()),
        );
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(
            json,
            r#"{"method":"htmlExtractor","resource":".menu-list > li"}"#
        );

        let files: ExtractionStrategy = serde_json::from_str(r#"{"method":"fileExtractor"}"#).unwrap();
        assert_eq!(files.method, ExtractionMethod::FileExtractor);
        assert_eq!(files.resource, None);
    }
}
