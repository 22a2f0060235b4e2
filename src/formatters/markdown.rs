//! Markdown Formatter
//!
//! Output format:
//! ```markdown
//! # Conversation title
//!
//! **Source:** https://chat.example.com/c/123
//!
//! **Date:** December 15, 2023 at 12:00:00 UTC
//!
//! ---
//!
//! First message text
//!
//! ---
//!
//! Second message text
//! ```
//!
//! Only the visible text of each message is kept. Code blocks, tables and
//! emphasis are flattened to plain text; this is a lossy simplification, not a
//! structural HTML to Markdown conversion.

use super::{format_timestamp, Formatter};
use crate::error::Result;
use crate::snapshot::{ChatSnapshot, ExportFormat, MESSAGE_MARKER_ATTR};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::fmt::Write;

/// Elements whose text is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line in rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Markdown formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Visible text of every message container, in order.
    pub fn message_texts(snapshot: &ChatSnapshot) -> Vec<String> {
        let fragment = Html::parse_fragment(snapshot.content());
        fragment
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().attr(MESSAGE_MARKER_ATTR).is_some())
            .map(visible_text)
            .collect()
    }
}

impl Formatter for MarkdownFormatter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(&self, snapshot: &ChatSnapshot) -> Result<String> {
        let mut out = String::with_capacity(snapshot.content().len() / 2 + 256);

        let title = snapshot.title().split_whitespace().collect::<Vec<_>>().join(" ");
        writeln!(out, "# {}", title)?;
        out.push('\n');
        writeln!(out, "**Source:** {}", snapshot.url())?;
        out.push('\n');
        writeln!(out, "**Date:** {}", format_timestamp(snapshot.timestamp()))?;

        for text in Self::message_texts(snapshot) {
            out.push_str("\n---\n\n");
            if text.is_empty() {
                out.push_str("*(empty)*\n");
            } else {
                out.push_str(&text);
                out.push('\n');
            }
        }

        Ok(out)
    }
}

/// Rendered text of an element with block elements on their own lines.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_ELEMENTS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }

    // Table cells stay on one line, separated by spaces
    if matches!(name, "td" | "th") {
        out.push(' ');
    }
    if block {
        out.push('\n');
    }
}

/// Collapse whitespace inside lines, keep at most one blank line between
/// paragraphs and escape lines that Markdown would read as a horizontal rule.
fn normalize(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        if opens_block(&collapsed) {
            lines.push(format!("\\{}", collapsed));
        } else {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

/// Lines that would start a Markdown construct swallowing the `---` separators
/// that follow: thematic breaks, code fences and raw HTML blocks.
fn opens_block(line: &str) -> bool {
    line.starts_with("```")
        || line.starts_with("~~~")
        || line.starts_with('<')
        || is_thematic_break(line)
}

fn is_thematic_break(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.iter().all(|c| c == marker))
}
