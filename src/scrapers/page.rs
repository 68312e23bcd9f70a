//! Parsed HTML page with forgiving query helpers.
//!
//! Every accessor returns `Option` or an empty `Vec` instead of failing: a
//! missing element, an empty text node and an invalid selector all look the
//! same to callers.
//!
//! `scraper::Html` is not `Send`, so a `PageDocument` must be created and
//! dropped between await points.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Parse a CSS selector, logging and discarding invalid ones.
fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("Invalid selector {:?}: {}", css, e);
            None
        }
    }
}

/// Collapse an element's text nodes into a single trimmed string.
fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn element_attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A fetched page ready for extraction.
pub struct PageDocument {
    url: String,
    base: Option<Url>,
    html: Html,
}

impl PageDocument {
    /// Parse a page body. `url` is the address the body was served from.
    pub fn parse(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            base: Url::parse(url).ok(),
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Text of the first element matching the selector.
    pub fn text(&self, css: &str) -> Option<String> {
        let sel = selector(css)?;
        self.html.select(&sel).find_map(element_text)
    }

    /// Attribute of the first element matching the selector.
    pub fn attr(&self, css: &str, name: &str) -> Option<String> {
        let sel = selector(css)?;
        self.html.select(&sel).find_map(|el| element_attr(el, name))
    }

    /// All elements matching the selector, in document order.
    pub fn select(&self, css: &str) -> Vec<PageElement<'_>> {
        match selector(css) {
            Some(sel) => self.html.select(&sel).map(PageElement).collect(),
            None => Vec::new(),
        }
    }

    /// Number of elements matching the selector.
    pub fn count(&self, css: &str) -> usize {
        match selector(css) {
            Some(sel) => self.html.select(&sel).count(),
            None => 0,
        }
    }

    /// Resolve a possibly relative link against this page.
    pub fn resolve(&self, href: &str) -> Option<String> {
        resolve_url(self.base.as_ref(), href)
    }
}

/// Resolve `href` against `base`. Absolute links pass through.
pub fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

/// An element inside a [`PageDocument`], queryable the same way.
#[derive(Clone, Copy)]
pub struct PageElement<'a>(ElementRef<'a>);

impl<'a> PageElement<'a> {
    /// This element's own text.
    pub fn own_text(&self) -> Option<String> {
        element_text(self.0)
    }

    /// This element's attribute.
    pub fn own_attr(&self, name: &str) -> Option<String> {
        element_attr(self.0, name)
    }

    /// Text of the first descendant matching the selector.
    pub fn text(&self, css: &str) -> Option<String> {
        let sel = selector(css)?;
        self.0.select(&sel).find_map(element_text)
    }

    /// Attribute of the first descendant matching the selector.
    pub fn attr(&self, css: &str, name: &str) -> Option<String> {
        let sel = selector(css)?;
        self.0.select(&sel).find_map(|el| element_attr(el, name))
    }

    /// Descendants matching the selector.
    pub fn select(&self, css: &str) -> Vec<PageElement<'a>> {
        match selector(css) {
            Some(sel) => self.0.select(&sel).map(PageElement).collect(),
            None => Vec::new(),
        }
    }
}
