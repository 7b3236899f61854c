//! Selector inference over a rendered DOM snapshot
//!
//! Two groups of probe words that appear on nearly every German or English
//! drinks menu are located in the page. The structural paths of the two hits
//! are merged into one CSS selector, which is then loosened one qualifier at a
//! time for as long as it still selects both probes. The result usually picks
//! out every item of the repeating menu block.

use scraper::{ElementRef, Html, Selector};
use std::fmt;

/// Water terms
pub const PRIMARY_TERMS: &[&str] = &["Wasser", "Mineralwasser", "Water"];

/// Common beverage terms
pub const SECONDARY_TERMS: &[&str] = &["Cola", "Kaffee"];

/// Elements whose text is never a menu item
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// What makes one level of a path more specific than its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Id(String),
    Classes(Vec<String>),
    /// 1-based index among same-tag siblings
    NthOfType(usize),
}

/// One level of a structural path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag: String,
    pub qualifier: Option<Qualifier>,
}

impl PathSegment {
    /// Describes an element: tag plus id, else classes, else sibling index
    fn describe(element: ElementRef<'_>) -> Self {
        let tag = element.value().name().to_string();

        let qualifier = if let Some(id) = element.value().id().filter(|id| !id.is_empty()) {
            Some(Qualifier::Id(id.to_string()))
        } else {
            let classes: Vec<String> = element
                .value()
                .attr("class")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();

            if !classes.is_empty() {
                Some(Qualifier::Classes(classes))
            } else {
                nth_of_type(element, &tag).map(Qualifier::NthOfType)
            }
        };

        Self { tag, qualifier }
    }

    fn bare(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            qualifier: None,
        }
    }
}

/// 1-based position among same-tag siblings, only if there is more than one
fn nth_of_type(element: ElementRef<'_>, tag: &str) -> Option<usize> {
    let parent = element.parent()?;
    let siblings: Vec<ElementRef<'_>> = parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == tag)
        .collect();

    if siblings.len() < 2 {
        return None;
    }

    siblings
        .iter()
        .position(|sibling| *sibling == element)
        .map(|index| index + 1)
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        match &self.qualifier {
            None => Ok(()),
            Some(Qualifier::Id(id)) => write!(f, "#{}", escape_identifier(id)),
            Some(Qualifier::Classes(classes)) => {
                for class in classes {
                    write!(f, ".{}", escape_identifier(class))?;
                }
                Ok(())
            }
            Some(Qualifier::NthOfType(index)) => write!(f, ":nth-of-type({})", index),
        }
    }
}

/// Escapes a CSS identifier so arbitrary ids and class names stay parseable
fn escape_identifier(ident: &str) -> String {
    let mut escaped = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        let leading_digit = c.is_ascii_digit() && (i == 0 || (i == 1 && ident.starts_with('-')));
        if leading_digit {
            escaped.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            escaped.push(c);
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    escaped
}

/// A child-combinator path from below `<body>` down to an element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssPath {
    segments: Vec<PathSegment>,
}

impl CssPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Structural path of an element, excluding `<body>` and its ancestors
    fn of_element(element: ElementRef<'_>) -> Self {
        let mut segments = Vec::new();
        let mut current = Some(element);

        while let Some(el) = current {
            if matches!(el.value().name(), "body" | "html") {
                break;
            }
            segments.push(PathSegment::describe(el));
            current = el.parent().and_then(ElementRef::wrap);
        }

        segments.reverse();
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of levels still carrying a qualifier
    pub fn qualifier_count(&self) -> usize {
        self.segments.iter().filter(|s| s.qualifier.is_some()).count()
    }

    /// Merges two paths level by level, up to the shorter length
    ///
    /// Identical levels are kept as they are; differing levels keep only the
    /// tag of the first path.
    pub fn merge(first: &CssPath, second: &CssPath) -> CssPath {
        let segments = first
            .segments
            .iter()
            .zip(&second.segments)
            .map(|(a, b)| if a == b { a.clone() } else { a.bare() })
            .collect();
        CssPath { segments }
    }

    /// Removes the qualifier of the deepest level that still has one
    ///
    /// Returns false if no level carries a qualifier.
    pub fn strip_deepest_qualifier(&mut self) -> bool {
        match self
            .segments
            .iter_mut()
            .rev()
            .find(|segment| segment.qualifier.is_some())
        {
            Some(segment) => {
                segment.qualifier = None;
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for CssPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// An element located by a probe term group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub path: CssPath,
    /// Direct text of the located element
    pub anchor: String,
}

/// Outcome of a successful inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub selector: CssPath,
    pub primary: Probe,
    pub secondary: Probe,
}

fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Trimmed direct text nodes of an element, joined by a single space
fn direct_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| text.trim().to_string()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn body(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body").ok()?;
    document.select(&selector).next()
}

/// Finds the first element below `<body>` whose direct text contains a term
fn locate(document: &Html, terms: &[&str]) -> Option<Probe> {
    let body = body(document)?;
    let folded_terms: Vec<String> = terms.iter().map(|t| fold_case(t)).collect();

    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let folded = fold_case(text);
        if !folded_terms.iter().any(|term| folded.contains(term.as_str())) {
            continue;
        }

        let Some(element) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if SKIPPED_TAGS.contains(&element.value().name()) {
            continue;
        }

        let path = CssPath::of_element(element);
        if path.is_empty() {
            continue;
        }

        return Some(Probe {
            path,
            anchor: direct_text(element),
        });
    }

    None
}

/// Checks that the selector still selects both anchors
fn selects_both(document: &Html, selector: &CssPath, primary: &str, secondary: &str) -> bool {
    let Ok(parsed) = Selector::parse(&selector.to_string()) else {
        return false;
    };

    let primary = fold_case(primary);
    let secondary = fold_case(secondary);
    let mut found_primary = false;
    let mut found_secondary = false;

    for element in document.select(&parsed) {
        let text = fold_case(&direct_text(element));
        found_primary |= text.contains(&primary);
        found_secondary |= text.contains(&secondary);
        if found_primary && found_secondary {
            return true;
        }
    }

    false
}

fn generalize_in(document: &Html, mut candidate: CssPath, primary: &str, secondary: &str) -> Option<CssPath> {
    if candidate.is_empty() {
        return None;
    }

    let mut last_valid = None;
    loop {
        if !selects_both(document, &candidate, primary, secondary) {
            break;
        }
        last_valid = Some(candidate.clone());
        if !candidate.strip_deepest_qualifier() {
            break;
        }
    }
    last_valid
}

/// Loosens a selector as far as it keeps selecting both anchor texts
///
/// # Arguments
///
/// * `html` - Serialized DOM of the page
/// * `candidate` - The starting selector
/// * `primary_anchor` - Text that must stay selected
/// * `secondary_anchor` - Second text that must stay selected
///
/// # Returns
///
/// * `Some(CssPath)` - The most general selector that still validates
/// * `None` - The starting selector itself does not validate
pub fn generalize(
    html: &str,
    candidate: CssPath,
    primary_anchor: &str,
    secondary_anchor: &str,
) -> Option<CssPath> {
    let document = Html::parse_document(html);
    generalize_in(&document, candidate, primary_anchor, secondary_anchor)
}

/// Runs the full inference and keeps the probes it was anchored on
pub fn infer(html: &str) -> Option<Inference> {
    let document = Html::parse_document(html);

    let primary = locate(&document, PRIMARY_TERMS)?;
    let secondary = locate(&document, SECONDARY_TERMS)?;

    let merged = CssPath::merge(&primary.path, &secondary.path);
    let selector = generalize_in(&document, merged, &primary.anchor, &secondary.anchor)?;

    Some(Inference {
        selector,
        primary,
        secondary,
    })
}

/// Infers the CSS selector of the repeating menu item block
///
/// # Examples
///
/// ```
/// use menu_harvest::extract::selector::infer_selector;
///
/// let html = r#"<html><body><ul class="menu-list">
///     <li>Mineralwasser 2,50</li><li>Cola 3,00</li><li>Pizza 9,00</li>
/// </ul></body></html>"#;
/// assert_eq!(infer_selector(html).as_deref(), Some("ul > li"));
/// ```
pub fn infer_selector(html: &str) -> Option<String> {
    infer(html).map(|inference| inference.selector.to_string())
}

/// Direct text of every element matching the selector, in document order
///
/// Empty texts are dropped. An unparsable selector yields nothing.
pub fn extract_data(html: &str, selector: &str) -> Vec<String> {
    let Ok(parsed) = Selector::parse(selector) else {
        tracing::warn!("Cannot parse selector '{}'", selector);
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&parsed)
        .map(direct_text)
        .filter(|text| !text.is_empty())
        .collect()
}
