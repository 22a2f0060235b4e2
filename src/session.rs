//! Export session - wires the background, content and popup contexts
//! together for one loaded page.
//!
//! ```text
//! Popup / shortcut ──► CommandDispatcher ──► tab listener ──► ContentScript
//!                                                                  │ saveFile
//!                      DownloadHandler ◄── runtime channel ◄───────┘
//! ```

use crate::config::Config;
use crate::content::{ContentScript, Notifier, Outcome, WindowOpener};
use crate::dispatcher::{CommandDispatcher, KeyBindings, Popup};
use crate::downloads::{DownloadHandler, DownloadManager};
use crate::error::{ExportError, Result};
use crate::extractors::{Page, PageExtractor};
use crate::runtime::{runtime_channel, BlobStore, TabId, TabRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Everything a finished session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub outcomes: Vec<Outcome>,
    pub saved: Vec<PathBuf>,
    /// Object URLs still registered after shutdown. Zero unless something leaked.
    pub live_object_urls: usize,
}

/// A page open in a tab, with its content and download tasks running.
///
/// Must be started inside a tokio runtime.
pub struct ExportSession {
    tabs: TabRegistry,
    tab: TabId,
    dispatcher: CommandDispatcher,
    blobs: BlobStore,
    content: JoinHandle<Vec<Outcome>>,
    downloads: JoinHandle<Vec<PathBuf>>,
}

impl ExportSession {
    pub fn start(
        page: Page,
        config: &Config,
        manager: Arc<dyn DownloadManager>,
        notifier: Arc<dyn Notifier>,
        windows: Arc<dyn WindowOpener>,
    ) -> Result<Self> {
        let extractor = PageExtractor::from_config(&config.extraction)?;

        let tabs = TabRegistry::new();
        let tab = tabs.open_tab(page.url().unwrap_or("about:blank"));
        let blobs = BlobStore::new();
        let (sender, outbox) = runtime_channel();

        let script = ContentScript::new(
            page,
            Arc::new(extractor),
            sender,
            blobs.clone(),
            config.print.clone(),
            notifier,
            windows,
        )
        .with_keybindings(KeyBindings::from_config(&config.keybindings))
        .with_default_format(config.export.default_format);

        // The listener is registered before any command can be dispatched
        let inbox = tabs
            .listen(tab)
            .ok_or_else(|| ExportError::Delivery(format!("Tab {} vanished", tab)))?;

        let content = tokio::spawn(script.run(inbox));
        let downloads = tokio::spawn(DownloadHandler::new(blobs.clone(), manager).run(outbox));
        debug!(tab, "Export session started");

        Ok(Self {
            dispatcher: CommandDispatcher::new(Arc::new(tabs.clone())),
            tabs,
            tab,
            blobs,
            content,
            downloads,
        })
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn popup(&self) -> Popup {
        Popup::new(self.dispatcher.clone())
    }

    /// Close the tab, let both tasks drain their queues and collect results.
    pub async fn finish(self) -> Result<SessionReport> {
        self.tabs.close_tab(self.tab);

        // Content finishing drops the runtime sender, which ends the download loop
        let outcomes = self.content.await?;
        let saved = self.downloads.await?;
        debug!(
            outcomes = outcomes.len(),
            saved = saved.len(),
            "Export session finished"
        );

        Ok(SessionReport {
            outcomes,
            saved,
            live_object_urls: self.blobs.live_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PrintWindow;
    use crate::dispatcher::Delivery;
    use crate::downloads::DirectoryDownloads;
    use tempfile::TempDir;

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _message: &str) {}
    }

    struct Blocked;

    impl WindowOpener for Blocked {
        fn open(&self, _features: &str) -> Option<Box<dyn PrintWindow>> {
            None
        }
    }

    fn page() -> Page {
        Page::new(
            r#"<html><head><title>Session Chat</title></head><body>
               <div data-message-id="1">Hi</div></body></html>"#,
            Some("https://chat.example.com/c/9".to_string()),
        )
    }

    #[tokio::test]
    async fn test_popup_export_is_saved() {
        let temp = TempDir::new().unwrap();
        let session = ExportSession::start(
            page(),
            &Config::default(),
            Arc::new(DirectoryDownloads::new(temp.path())),
            Arc::new(Silent),
            Arc::new(Blocked),
        )
        .unwrap();

        assert_eq!(session.popup().click_export_markdown(), Delivery::Sent(session.tab()));
        let report = session.finish().await.unwrap();

        assert_eq!(report.saved, vec![temp.path().join("Session Chat.md")]);
        assert_eq!(report.live_object_urls, 0);
    }

    #[tokio::test]
    async fn test_finish_without_commands() {
        let temp = TempDir::new().unwrap();
        let session = ExportSession::start(
            page(),
            &Config::default(),
            Arc::new(DirectoryDownloads::new(temp.path())),
            Arc::new(Silent),
            Arc::new(Blocked),
        )
        .unwrap();

        let report = session.finish().await.unwrap();
        assert_eq!(report, SessionReport::default());
    }
}
