//! Owned element snapshots.
//!
//! A rendered element is captured as its outer HTML so it can cross await
//! points; queries re-parse the fragment with `scraper` on demand.

use crate::error::FetchError;
use scraper::{ElementRef, Html, Selector};

/// A listing-level DOM element detached from its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    html: String,
}

impl Element {
    /// Wraps an element's outer HTML.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Captures a parsed element.
    pub fn capture(element: ElementRef<'_>) -> Self {
        Self { html: element.html() }
    }

    /// Returns the first descendant matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, FetchError> {
        let selector = parse_selector(selector)?;
        Ok(self.with_root(|root| root.select(&selector).next().map(Element::capture)).flatten())
    }

    /// Returns every descendant matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, FetchError> {
        let selector = parse_selector(selector)?;
        Ok(self
            .with_root(|root| root.select(&selector).map(Element::capture).collect())
            .unwrap_or_default())
    }

    /// Concatenated text content of the element and its descendants.
    ///
    /// Read from the whole fragment: fragment parsing drops `<body>` and
    /// `<html>` tags, leaving their children at the top level.
    pub fn text(&self) -> String {
        Html::parse_fragment(&self.html).root_element().text().collect()
    }

    /// Value of an attribute on the element itself.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_root(|root| root.value().attr(name).map(String::from)).flatten()
    }

    fn with_root<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Option<T> {
        let fragment = Html::parse_fragment(&self.html);
        let root = fragment.root_element().children().find_map(ElementRef::wrap)?;
        Some(f(root))
    }
}

/// Runs `selector` against a whole HTML document.
pub(crate) fn select_document(html: &str, selector: &str) -> Result<Vec<Element>, FetchError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).map(Element::capture).collect())
}

/// Compiles a CSS selector, mapping parse failures into [`FetchError`].
pub fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}
