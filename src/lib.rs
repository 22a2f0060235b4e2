//! chat-printer - Export the visible chat thread of a conversation page.
//!
//! A command (shortcut, popup click or CLI call) reaches the content side of
//! a page, which extracts the message nodes through an ordered selector
//! chain, strips copy affordances from detached clones and renders the
//! snapshot as an HTML download, a Markdown download or a print preview.

pub mod config;
pub mod content;
pub mod dispatcher;
pub mod downloads;
pub mod error;
pub mod extractors;
pub mod formatters;
pub mod runtime;
pub mod session;
pub mod snapshot;
pub mod utils;

pub use config::Config;
pub use error::{ExportError, Result};
pub use session::{ExportSession, SessionReport};
pub use snapshot::{ChatSnapshot, ExportAction, ExportFormat, ExportRequest};
