//! Selector fallback chain.
//!
//! Chat page markup changes between deployments, so message nodes are located
//! through an ordered list of known structural patterns. The first pattern that
//! matches at least one node wins and the rest are never evaluated.

use crate::error::{ExportError, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// One matcher strategy: a compiled CSS selector plus its source text.
#[derive(Debug, Clone)]
pub struct MatcherStrategy {
    source: String,
    selector: Selector,
}

impl MatcherStrategy {
    pub fn parse(source: &str) -> Result<Self> {
        let selector = Selector::parse(source).map_err(|e| ExportError::InvalidSelector {
            selector: source.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Nodes matched by the winning strategy.
#[derive(Debug)]
pub struct ChainMatch<'a> {
    /// Position of the winning strategy in the chain
    pub priority: usize,
    /// Selector text of the winning strategy
    pub selector: &'a str,
    /// Matched nodes in document order
    pub nodes: Vec<ElementRef<'a>>,
}

/// Ordered list of matcher strategies evaluated with early exit.
#[derive(Debug, Clone, Default)]
pub struct SelectorChain {
    strategies: Vec<MatcherStrategy>,
}

impl SelectorChain {
    /// Compile a chain. Fails on the first selector that does not parse.
    pub fn new<I, S>(selectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strategies = selectors
            .into_iter()
            .map(|s| MatcherStrategy::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { strategies })
    }

    pub fn strategies(&self) -> &[MatcherStrategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Evaluate strategies in priority order and return the first non-empty match.
    pub fn first_match<'a>(&'a self, document: &'a Html) -> Option<ChainMatch<'a>> {
        for (priority, strategy) in self.strategies.iter().enumerate() {
            let nodes: Vec<ElementRef<'a>> = document.select(&strategy.selector).collect();
            debug!(
                selector = %strategy.source,
                matches = nodes.len(),
                "Evaluated message selector"
            );

            if !nodes.is_empty() {
                return Some(ChainMatch {
                    priority,
                    selector: &strategy.source,
                    nodes,
                });
            }
        }

        None
    }

    /// Match count of every strategy, without early exit (diagnostics only).
    pub fn match_counts(&self, document: &Html) -> Vec<(String, usize)> {
        self.strategies
            .iter()
            .map(|s| (s.source.clone(), document.select(&s.selector).count()))
            .collect()
    }
}
