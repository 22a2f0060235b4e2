//! Request-scoped value types: the export request and the extracted chat snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Attribute that marks one exported message container inside `ChatSnapshot::content`.
pub const MESSAGE_MARKER_ATTR: &str = "data-export-message";

/// What the content context should do with the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportAction {
    #[serde(rename = "exportChat")]
    Export,
    #[serde(rename = "printChat")]
    Print,
}

/// Output document type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Html,
    Markdown,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "md",
        }
    }

    /// MIME type of the produced document.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Html => write!(f, "html"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A single export request, consumed exactly once by the content context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub action: ExportAction,
    pub format: ExportFormat,
}

impl ExportRequest {
    pub fn export(format: ExportFormat) -> Self {
        Self {
            action: ExportAction::Export,
            format,
        }
    }

    /// Print previews are always rendered as HTML.
    pub fn print() -> Self {
        Self {
            action: ExportAction::Print,
            format: ExportFormat::Html,
        }
    }
}

/// Immutable record of one extraction.
///
/// `content` holds one `<div class="message" data-export-message="N">` container
/// per matched node, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    title: String,
    content: String,
    url: String,
    timestamp: DateTime<Utc>,
    #[serde(skip)]
    message_count: usize,
}

impl ChatSnapshot {
    /// Build a snapshot from already sanitized message fragments.
    pub fn new(
        title: impl Into<String>,
        messages: &[String],
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut content = String::with_capacity(messages.iter().map(|m| m.len() + 64).sum());
        for (idx, message) in messages.iter().enumerate() {
            // Writing to a String cannot fail
            let _ = write!(
                content,
                "<div class=\"message\" {}=\"{}\">{}</div>",
                MESSAGE_MARKER_ATTR, idx, message
            );
        }

        Self {
            title: title.into(),
            content,
            url: url.into(),
            timestamp,
            message_count: messages.len(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }
}
