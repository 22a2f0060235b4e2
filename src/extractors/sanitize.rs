//! Sanitizer - strips interactive UI chrome from cloned message nodes.
//!
//! The live page is never touched: each node's subtree is copied into its own
//! fragment tree, leaving out strip-selector matches. The copy works on nodes
//! rather than re-parsed markup, so elements that only parse inside a table
//! (`tr`, `td`, ...) keep their structure.

use super::selector_chain::MatcherStrategy;
use crate::error::Result;
use scraper::{ElementRef, Html};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    strip: Vec<MatcherStrategy>,
}

impl Sanitizer {
    pub fn new<I, S>(strip_selectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strip = strip_selectors
            .into_iter()
            .map(|s| MatcherStrategy::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { strip })
    }

    /// Clone `node` without any strip-selector match below it and return the
    /// cleaned node markup.
    pub fn clean(&self, node: ElementRef<'_>) -> String {
        // `select` never yields `node` itself
        let doomed: HashSet<_> = self
            .strip
            .iter()
            .flat_map(|strategy| node.select(strategy.selector()).map(|el| el.id()))
            .collect();

        let mut clone = Html::new_fragment();
        let mut pending = vec![(*node, clone.tree.root().id())];

        while let Some((source, parent)) = pending.pop() {
            let Some(mut parent) = clone.tree.get_mut(parent) else {
                continue;
            };
            let copied = parent.append(source.value().clone()).id();

            let children: Vec<_> = source
                .children()
                .filter(|child| !doomed.contains(&child.id()))
                .collect();
            // Reversed so siblings come off the stack in document order
            pending.extend(children.into_iter().rev().map(|child| (child, copied)));
        }

        clone
            .tree
            .root()
            .first_child()
            .and_then(ElementRef::wrap)
            .map(|el| el.html())
            .unwrap_or_default()
    }
}
