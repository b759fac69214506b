//! Parsed HTML documents
//!
//! A successful load stores its body as an [`HtmlDocument`]. Parsing removes
//! `<script>`, `<noscript>` and `<iframe>` elements so only page markup and
//! text remain, and the document can then be queried with CSS selectors.

use crate::DocumentError;
use scraper::{ElementRef, Html, Selector};

/// Elements stripped from every document after parsing
const STRIPPED_ELEMENTS: &str = "script, noscript, iframe";

/// A parsed, queryable HTML document
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parses an HTML body into a document
    ///
    /// HTML parsing is error tolerant: malformed markup still yields a
    /// document, and an empty body yields an empty one.
    ///
    /// # Example
    ///
    /// ```
    /// use bulk_html_loader::HtmlDocument;
    ///
    /// let doc = HtmlDocument::parse("<html><head><title>Hi</title><script>x()</script></head></html>");
    /// assert_eq!(doc.title(), Some("Hi".to_string()));
    /// assert!(doc.query("script").unwrap().is_empty());
    /// ```
    pub fn parse(body: &str) -> Self {
        let mut html = Html::parse_document(body);

        if let Ok(selector) = Selector::parse(STRIPPED_ELEMENTS) {
            let ids: Vec<_> = html.select(&selector).map(|element| element.id()).collect();
            for id in ids {
                if let Some(mut node) = html.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        Self { html }
    }

    /// Returns every element matching a CSS selector
    pub fn query(&self, selector: &str) -> Result<Vec<ElementRef<'_>>, DocumentError> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).collect())
    }

    /// Returns the trimmed text content of every matching element
    pub fn select_text(&self, selector: &str) -> Result<Vec<String>, DocumentError> {
        Ok(self
            .query(selector)?
            .into_iter()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .collect())
    }

    /// Returns the value of `attr` on every matching element that has it
    pub fn select_attr(&self, selector: &str, attr: &str) -> Result<Vec<String>, DocumentError> {
        Ok(self
            .query(selector)?
            .into_iter()
            .filter_map(|element| element.value().attr(attr).map(str::to_string))
            .collect())
    }

    /// Extracts the page title from the `<title>` tag
    pub fn title(&self) -> Option<String> {
        self.select_text("title")
            .ok()?
            .into_iter()
            .next()
            .filter(|s| !s.is_empty())
    }

    /// Serializes the (stripped) document back to HTML
    pub fn html(&self) -> String {
        self.html.html()
    }

    /// Underlying `scraper` document
    pub fn as_html(&self) -> &Html {
        &self.html
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DocumentError> {
    Selector::parse(selector).map_err(|e| DocumentError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
