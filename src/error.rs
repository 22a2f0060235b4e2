//! Error types for the export pipeline.

use thiserror::Error;

/// Notice shown when no message node matched any selector.
pub const EMPTY_CONVERSATION_NOTICE: &str =
    "No chat messages found. Make sure you are on a chat conversation page.";

/// Notice shown when the print window could not be opened.
pub const POPUP_BLOCKED_NOTICE: &str =
    "Please allow pop-ups for this site to print the conversation.";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{}", EMPTY_CONVERSATION_NOTICE)]
    EmptyConversation,

    #[error("{}", POPUP_BLOCKED_NOTICE)]
    PopupBlocked,

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Message delivery failed: {0}")]
    Delivery(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Object URL not found: {0}")]
    UnknownObjectUrl(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl ExportError {
    /// Text shown to the user for this failure.
    pub fn notice(&self) -> String {
        match self {
            ExportError::EmptyConversation | ExportError::PopupBlocked => self.to_string(),
            other => format!("Export failed: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
