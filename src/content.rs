//! Content script - the page-side half of every export.
//!
//! One `ContentScript` is bound to one loaded page. Each request re-reads the
//! page, renders a fresh document and either hands it to the background for
//! download or writes it into a print window. Failures never escape
//! `handle`: they are logged and turned into a user-facing notice.

use crate::config::PrintConfig;
use crate::dispatcher::KeyBindings;
use crate::error::{ExportError, Result};
use crate::extractors::{Extraction, Extractor, Page};
use crate::formatters::{export_formatter, print_formatter, Formatter};
use crate::runtime::{BlobStore, Envelope, Listener, RuntimeMessage, RuntimeSender};
use crate::snapshot::{ChatSnapshot, ExportAction, ExportFormat, ExportRequest};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shows short messages to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Opens auxiliary windows. `None` means the window was blocked.
pub trait WindowOpener: Send + Sync {
    fn open(&self, features: &str) -> Option<Box<dyn PrintWindow>>;
}

/// A freshly opened, empty document window.
pub trait PrintWindow {
    fn write(&mut self, html: &str) -> Result<()>;
    fn close_document(&mut self) -> Result<()>;
    fn focus(&mut self);
}

/// What one request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A `saveFile` message went to the background.
    Downloaded { filename: String },
    /// The print preview window received its document.
    PrintOpened,
    /// Nothing matched; the user was told so.
    Empty,
    /// Failed with the notice shown to the user.
    Failed { notice: String },
}

/// Page-side request handler.
pub struct ContentScript {
    page: Page,
    extractor: Arc<dyn Extractor>,
    sender: RuntimeSender,
    blobs: BlobStore,
    print: PrintConfig,
    notifier: Arc<dyn Notifier>,
    windows: Arc<dyn WindowOpener>,
    keybindings: KeyBindings,
    default_format: ExportFormat,
}

impl ContentScript {
    pub fn new(
        page: Page,
        extractor: Arc<dyn Extractor>,
        sender: RuntimeSender,
        blobs: BlobStore,
        print: PrintConfig,
        notifier: Arc<dyn Notifier>,
        windows: Arc<dyn WindowOpener>,
    ) -> Self {
        Self {
            page,
            extractor,
            sender,
            blobs,
            print,
            notifier,
            windows,
            keybindings: KeyBindings::default(),
            default_format: ExportFormat::default(),
        }
    }

    pub fn with_keybindings(mut self, keybindings: KeyBindings) -> Self {
        self.keybindings = keybindings;
        self
    }

    /// Format used for `exportChat` messages that carry no `type`.
    pub fn with_default_format(mut self, format: ExportFormat) -> Self {
        self.default_format = format;
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Handle one request. Every failure is caught here and reported.
    pub fn handle(&self, request: ExportRequest) -> Outcome {
        let attempt = catch_unwind(AssertUnwindSafe(|| self.try_handle(request)));

        let result = match attempt {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unexpected panic".to_string());
                Err(ExportError::Render(detail))
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(ExportError::EmptyConversation) => {
                self.notifier.notify(&ExportError::EmptyConversation.notice());
                Outcome::Empty
            }
            Err(e @ ExportError::PopupBlocked) => {
                warn!("Print window was blocked");
                let notice = e.notice();
                self.notifier.notify(&notice);
                Outcome::Failed { notice }
            }
            Err(e) => {
                error!(error = ?e, action = ?request.action, "Export failed");
                let notice = e.notice();
                self.notifier.notify(&notice);
                Outcome::Failed { notice }
            }
        }
    }

    /// Handle an incoming runtime message. Non-request messages are ignored.
    pub fn handle_message(&self, message: &RuntimeMessage) -> Option<Outcome> {
        match message.to_request(self.default_format) {
            Some(request) => Some(self.handle(request)),
            None => {
                debug!(message = ?message, "Ignoring message not meant for the page");
                None
            }
        }
    }

    /// In-page keyboard fallback.
    pub fn on_key(&self, combo: &str) -> Option<Outcome> {
        let command = self.keybindings.resolve(combo)?;
        debug!(combo, command = command.name(), "Key binding triggered");
        Some(self.handle(command.request()))
    }

    /// Process messages until the subscription ends.
    pub async fn run(self, mut listener: Listener<RuntimeMessage>) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(message) = listener.recv().await {
            if let Some(outcome) = self.handle_message(&message) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn try_handle(&self, request: ExportRequest) -> Result<Outcome> {
        let snapshot = self.snapshot()?;
        match request.action {
            ExportAction::Export => self.export(&snapshot, request.format),
            ExportAction::Print => self.print(&snapshot),
        }
    }

    fn snapshot(&self) -> Result<ChatSnapshot> {
        match self.extractor.extract(&self.page)? {
            Extraction::Snapshot(snapshot) if !snapshot.is_empty() => Ok(snapshot),
            _ => Err(ExportError::EmptyConversation),
        }
    }

    fn export(&self, snapshot: &ChatSnapshot, format: ExportFormat) -> Result<Outcome> {
        let formatter = export_formatter(format);
        let document = formatter.render(snapshot)?;
        let filename = formatter.filename(snapshot);

        let url = self
            .blobs
            .create_object_url(document.into_bytes(), format.mime_type());
        self.sender
            .send(Envelope::save_file(url, filename.clone()))
            .map_err(|e| ExportError::Delivery(e.to_string()))?;

        info!(
            filename = %filename,
            format = %format,
            messages = snapshot.message_count(),
            "Requested download"
        );
        Ok(Outcome::Downloaded { filename })
    }

    fn print(&self, snapshot: &ChatSnapshot) -> Result<Outcome> {
        let document = print_formatter(&self.print).render(snapshot)?;

        let mut window = self
            .windows
            .open(&self.print.window_features)
            .ok_or(ExportError::PopupBlocked)?;
        window.write(&document)?;
        window.close_document()?;
        window.focus();

        info!(messages = snapshot.message_count(), "Opened print preview");
        Ok(Outcome::PrintOpened)
    }
}
