//! Extractors module - Locate and sanitize chat messages on a loaded page.
//!
//! Principle: the page is read-only. Sanitization happens on detached clones
//! and the result is an immutable `ChatSnapshot`.

pub mod sanitize;
pub mod selector_chain;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::snapshot::ChatSnapshot;
use chrono::Utc;
use scraper::{Html, Selector};
use std::path::Path;
use tracing::{debug, warn};

pub use sanitize::Sanitizer;
pub use selector_chain::{ChainMatch, MatcherStrategy, SelectorChain};

/// A loaded chat page: its markup plus the location it was loaded from.
#[derive(Debug, Clone)]
pub struct Page {
    source: String,
    url: Option<String>,
}

impl Page {
    pub fn new(source: impl Into<String>, url: Option<String>) -> Self {
        Self {
            source: source.into(),
            url,
        }
    }

    /// Load a saved page from disk.
    pub fn from_file(path: &Path, url: Option<String>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::new(source, url))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Location the page was loaded from, when known.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Parse the page markup. Each call yields a fresh document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.source)
    }
}

/// Page title from `<title>`, trimmed. `None` when missing or blank.
pub fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// Page location: the explicit URL if known, else canonical link, else og:url.
pub fn page_url(document: &Html, explicit: Option<&str>) -> String {
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        return url.trim().to_string();
    }

    let candidates = [
        (r#"link[rel="canonical"]"#, "href"),
        (r#"meta[property="og:url"]"#, "content"),
    ];

    candidates
        .iter()
        .filter_map(|(selector, attr)| {
            let selector = Selector::parse(selector).ok()?;
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .next()
        .unwrap_or_else(|| "about:blank".to_string())
}

/// Outcome of one extraction. An empty page is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Snapshot(ChatSnapshot),
    Empty,
}

/// Trait for all extractors.
pub trait Extractor: Send + Sync {
    /// Strategy name (for logging)
    fn name(&self) -> &'static str;

    /// Extract a snapshot from the page.
    fn extract(&self, page: &Page) -> Result<Extraction>;
}

/// Selector-chain extractor.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    chain: SelectorChain,
    sanitizer: Sanitizer,
    default_title: String,
}

impl PageExtractor {
    pub fn new(chain: SelectorChain, sanitizer: Sanitizer, default_title: impl Into<String>) -> Self {
        Self {
            chain,
            sanitizer,
            default_title: default_title.into(),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self::new(
            SelectorChain::new(&config.selectors)?,
            Sanitizer::new(&config.strip_selectors)?,
            config.default_title.clone(),
        ))
    }

    pub fn chain(&self) -> &SelectorChain {
        &self.chain
    }
}

impl Extractor for PageExtractor {
    fn name(&self) -> &'static str {
        "selector-chain"
    }

    fn extract(&self, page: &Page) -> Result<Extraction> {
        let timestamp = Utc::now();
        let document = page.document();

        let Some(matched) = self.chain.first_match(&document) else {
            warn!(
                selectors = self.chain.len(),
                "No chat messages matched any selector"
            );
            return Ok(Extraction::Empty);
        };

        debug!(
            selector = matched.selector,
            priority = matched.priority,
            count = matched.nodes.len(),
            "Matched chat messages"
        );

        let messages: Vec<String> = matched
            .nodes
            .iter()
            .map(|node| self.sanitizer.clean(*node))
            .collect();

        let title = page_title(&document).unwrap_or_else(|| self.default_title.clone());
        let url = page_url(&document, page.url.as_deref());

        Ok(Extraction::Snapshot(ChatSnapshot::new(
            title, &messages, url, timestamp,
        )))
    }
}
