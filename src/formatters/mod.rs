//! Formatters module - Render a `ChatSnapshot` into an output document.
//!
//! Every formatter is a pure function of the snapshot: no state is shared
//! between calls.

pub mod document;
pub mod html;
pub mod markdown;

use crate::config::{PrintConfig, DEFAULT_TITLE};
use crate::error::Result;
use crate::snapshot::{ChatSnapshot, ExportFormat};
use chrono::{DateTime, Utc};

pub use html::{HtmlFormatter, PrintOptions};
pub use markdown::MarkdownFormatter;

/// Maximum filename stem length, in characters.
const MAX_STEM_CHARS: usize = 120;

/// Names Windows refuses as file stems.
const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Trait for all formatters.
pub trait Formatter: Send + Sync {
    /// Output format produced
    fn format(&self) -> ExportFormat;

    /// Render a snapshot to a document string
    fn render(&self, snapshot: &ChatSnapshot) -> Result<String>;

    /// Download filename for a snapshot
    fn filename(&self, snapshot: &ChatSnapshot) -> String {
        format!(
            "{}.{}",
            sanitize_filename(snapshot.title()),
            self.format().extension()
        )
    }
}

/// Formatter for a download of the given format.
pub fn export_formatter(format: ExportFormat) -> Box<dyn Formatter> {
    match format {
        ExportFormat::Html => Box::new(HtmlFormatter::export()),
        ExportFormat::Markdown => Box::new(MarkdownFormatter::new()),
    }
}

/// Formatter for the print preview window.
pub fn print_formatter(config: &PrintConfig) -> HtmlFormatter {
    HtmlFormatter::print(PrintOptions::from(config))
}

/// Make a title safe to use as a filename stem.
///
/// Path separators and characters reserved on common filesystems become `_`,
/// control characters become spaces. Whitespace runs collapse to one space, leading and
/// trailing dots/spaces are dropped and the result is capped at
/// `MAX_STEM_CHARS`.
pub fn sanitize_filename(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == ' ');
    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    stem = stem.trim_end_matches(|c: char| c == '.' || c == ' ').to_string();

    if stem.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let base = stem.split('.').next().unwrap_or_default();
    if RESERVED_STEMS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(base))
    {
        let at = base.len();
        stem.insert(at, '_');
    }

    stem
}

/// Human-readable export timestamp.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%B %-d, %Y at %H:%M:%S UTC").to_string()
}
