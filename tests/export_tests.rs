//! Integration tests for the export pipeline with saved page fixtures.
//!
//! Covers extraction through the selector chain, HTML/Markdown synthesis,
//! the notice paths and the full dispatcher -> content -> download flow.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chat_printer::config::{Config, ExtractionConfig};
use chat_printer::content::{ContentScript, Notifier, Outcome, PrintWindow, WindowOpener};
use chat_printer::dispatcher::Delivery;
use chat_printer::downloads::DirectoryDownloads;
use chat_printer::error::{EMPTY_CONVERSATION_NOTICE, POPUP_BLOCKED_NOTICE};
use chat_printer::extractors::{Extraction, Extractor, Page, PageExtractor};
use chat_printer::formatters::{Formatter, HtmlFormatter, MarkdownFormatter};
use chat_printer::runtime::{runtime_channel, BlobStore, Envelope, Listener};
use chat_printer::snapshot::MESSAGE_MARKER_ATTR;
use chat_printer::{ChatSnapshot, ExportFormat, ExportRequest, ExportSession};
use tempfile::TempDir;

/// Helper: get absolute path to a test fixture file.
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> Page {
    let path = fixture_path(name);
    assert!(path.exists(), "Fixture file missing: {:?}", path);
    Page::from_file(&path, None).expect("Failed to read fixture")
}

fn extractor() -> PageExtractor {
    PageExtractor::from_config(&ExtractionConfig::default()).expect("default selectors parse")
}

fn extract_snapshot(name: &str) -> ChatSnapshot {
    match extractor().extract(&load_fixture(name)).unwrap() {
        Extraction::Snapshot(snapshot) => snapshot,
        Extraction::Empty => panic!("fixture {} produced no messages", name),
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

/// Window opener whose windows record every write.
#[derive(Default)]
struct RecordingOpener {
    blocked: bool,
    written: Arc<Mutex<Vec<String>>>,
}

struct RecordingWindow {
    written: Arc<Mutex<Vec<String>>>,
}

impl PrintWindow for RecordingWindow {
    fn write(&mut self, html: &str) -> chat_printer::Result<()> {
        self.written.lock().unwrap().push(html.to_string());
        Ok(())
    }

    fn close_document(&mut self) -> chat_printer::Result<()> {
        Ok(())
    }

    fn focus(&mut self) {}
}

impl WindowOpener for RecordingOpener {
    fn open(&self, _features: &str) -> Option<Box<dyn PrintWindow>> {
        if self.blocked {
            return None;
        }
        Some(Box::new(RecordingWindow {
            written: self.written.clone(),
        }))
    }
}

// ===========================================================================
// Extraction
// ===========================================================================

mod extraction {
    use super::*;

    #[test]
    fn test_first_matching_selector_sets_message_count() {
        // div[data-message-id] is the first selector with matches
        let snapshot = extract_snapshot("conversation.html");
        assert_eq!(snapshot.message_count(), 4);
        assert_eq!(snapshot.title(), "Test Conversation");
        assert_eq!(snapshot.url(), "https://chat.openai.com/c/test-conversation");
    }

    #[test]
    fn test_turn_articles_take_priority() {
        // Three message divs exist, but the two turn articles match first
        let snapshot = extract_snapshot("conversation_turns.html");
        assert_eq!(snapshot.message_count(), 2);
    }

    #[test]
    fn test_last_resort_selector() {
        let snapshot = extract_snapshot("hostile_title.html");
        assert_eq!(snapshot.message_count(), 2);
    }

    #[test]
    fn test_empty_page_has_no_snapshot() {
        let result = extractor().extract(&load_fixture("empty.html")).unwrap();
        assert_eq!(result, Extraction::Empty);
    }

    #[test]
    fn test_extraction_is_repeatable_and_leaves_page_intact() {
        let page = load_fixture("conversation.html");
        let before = page.source().to_string();

        let first = extractor().extract(&page).unwrap();
        let second = extractor().extract(&page).unwrap();

        let (Extraction::Snapshot(a), Extraction::Snapshot(b)) = (first, second) else {
            panic!("expected snapshots");
        };
        assert_eq!(a.message_count(), b.message_count());
        assert_eq!(a.content(), b.content());
        assert_eq!(page.source(), before);
        assert!(page.source().contains(r#"<button class="copy-button">Copy</button>"#));
    }

    #[test]
    fn test_copy_affordances_are_stripped() {
        let snapshot = extract_snapshot("conversation.html");

        assert!(!snapshot.content().contains("<button"));
        assert!(!snapshot.content().contains("copy-button"));
        assert!(!snapshot.content().contains("copy-turn-action-button"));
        assert!(snapshot.content().contains("What is the capital of France?"));
        assert!(snapshot.content().contains("<strong>Paris</strong>"));
        assert!(snapshot.content().contains("Hello, world!"));
    }
}

// ===========================================================================
// Synthesis
// ===========================================================================

mod synthesis {
    use super::*;

    #[test]
    fn test_html_export_scenario() {
        let snapshot = extract_snapshot("conversation.html");
        let formatter = HtmlFormatter::export();
        let html = formatter.render(&snapshot).unwrap();

        assert_eq!(formatter.filename(&snapshot), "Test Conversation.html");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("@media print"));
        assert_eq!(
            html.matches(&format!("{}=", MESSAGE_MARKER_ATTR)).count(),
            4
        );

        let order: Vec<usize> = [
            "What is the capital of France?",
            "Paris",
            "Show me a Rust hello world.",
            "Hello, world!",
        ]
        .iter()
        .map(|needle| html.find(needle).expect("message text present"))
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_markdown_block_count() {
        for (fixture, expected) in [
            ("conversation.html", 4),
            ("conversation_turns.html", 2),
            ("hostile_title.html", 2),
        ] {
            let snapshot = extract_snapshot(fixture);
            let md = MarkdownFormatter::new().render(&snapshot).unwrap();
            assert_eq!(
                md.split("\n---\n").count() - 1,
                expected,
                "block count for {}",
                fixture
            );
        }
    }

    #[test]
    fn test_markdown_is_plain_text() {
        let snapshot = extract_snapshot("conversation.html");
        let formatter = MarkdownFormatter::new();
        let md = formatter.render(&snapshot).unwrap();

        assert_eq!(formatter.filename(&snapshot), "Test Conversation.md");
        assert!(md.starts_with("# Test Conversation\n"));
        assert!(md.contains("**Source:** https://chat.openai.com/c/test-conversation"));
        assert!(md.contains("The capital of France is Paris."));
        assert!(!md.contains("Copy code"));
        assert!(!md.contains("<"));
    }

    #[test]
    fn test_untrusted_title_is_escaped_and_sanitized() {
        let snapshot = extract_snapshot("hostile_title.html");
        let formatter = HtmlFormatter::export();
        let html = formatter.render(&snapshot).unwrap();

        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));

        let filename = formatter.filename(&snapshot);
        assert!(filename.ends_with(".html"));
        assert!(!filename.contains(['/', '\\', '<', '>', ':', '"', '?']));
    }
}

// ===========================================================================
// Content script notices
// ===========================================================================

mod notices {
    use super::*;

    fn script(
        fixture: &str,
        opener: Arc<RecordingOpener>,
    ) -> (
        ContentScript,
        Arc<RecordingNotifier>,
        BlobStore,
        Listener<Envelope>,
    ) {
        let (sender, outbox) = runtime_channel();
        let blobs = BlobStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let script = ContentScript::new(
            load_fixture(fixture),
            Arc::new(extractor()),
            sender,
            blobs.clone(),
            Config::default().print,
            notifier.clone(),
            opener,
        );
        (script, notifier, blobs, outbox)
    }

    #[test]
    fn test_zero_messages_notice_and_no_file() {
        let (script, notifier, blobs, mut outbox) =
            script("empty.html", Arc::new(RecordingOpener::default()));

        let outcome = script.handle(ExportRequest::export(ExportFormat::Html));

        assert_eq!(outcome, Outcome::Empty);
        assert_eq!(notifier.notices(), vec![EMPTY_CONVERSATION_NOTICE.to_string()]);
        assert!(outbox.try_recv().is_none());
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn test_blocked_window_notice_and_nothing_written() {
        let opener = Arc::new(RecordingOpener {
            blocked: true,
            ..Default::default()
        });
        let (script, notifier, _blobs, _outbox) = script("conversation.html", opener.clone());

        script.handle(ExportRequest::print());

        assert_eq!(notifier.notices(), vec![POPUP_BLOCKED_NOTICE.to_string()]);
        assert!(opener.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_print_preview_document() {
        let opener = Arc::new(RecordingOpener::default());
        let (script, notifier, _blobs, _outbox) = script("conversation.html", opener.clone());

        assert_eq!(script.handle(ExportRequest::print()), Outcome::PrintOpened);

        let written = opener.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].contains("window.print()"));
        assert!(written[0].contains("<title>Test Conversation</title>"));
        assert!(notifier.notices().is_empty());
    }
}

// ===========================================================================
// Full session: dispatcher -> content -> downloads
// ===========================================================================

mod session {
    use super::*;

    fn start(fixture: &str, dir: &Path, notifier: Arc<RecordingNotifier>) -> ExportSession {
        ExportSession::start(
            load_fixture(fixture),
            &Config::default(),
            Arc::new(DirectoryDownloads::new(dir)),
            notifier,
            Arc::new(RecordingOpener::default()),
        )
        .expect("session starts")
    }

    #[tokio::test]
    async fn test_shortcut_export_writes_file_and_revokes_url() {
        let temp = TempDir::new().unwrap();
        let session = start("conversation.html", temp.path(), Arc::default());

        assert_eq!(
            session.dispatcher().on_command("export-html"),
            Some(Delivery::Sent(session.tab()))
        );
        let report = session.finish().await.unwrap();

        let expected = temp.path().join("Test Conversation.html");
        assert_eq!(report.saved, vec![expected.clone()]);
        assert_eq!(report.live_object_urls, 0);

        let html = std::fs::read_to_string(expected).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("<button"));
    }

    #[tokio::test]
    async fn test_popup_and_shortcut_produce_two_files() {
        let temp = TempDir::new().unwrap();
        let session = start("conversation.html", temp.path(), Arc::default());

        session.popup().click_export_markdown();
        session.dispatcher().on_command("export-markdown");
        let report = session.finish().await.unwrap();

        assert_eq!(
            report.saved,
            vec![
                temp.path().join("Test Conversation.md"),
                temp.path().join("Test Conversation (1).md"),
            ]
        );
        // Same page, same document apart from the export timestamp
        let without_date = |path: &PathBuf| {
            std::fs::read_to_string(path)
                .unwrap()
                .lines()
                .filter(|line| !line.starts_with("**Date:**"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(without_date(&report.saved[0]), without_date(&report.saved[1]));
    }

    #[tokio::test]
    async fn test_empty_page_saves_nothing() {
        let temp = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let session = start("empty.html", temp.path(), notifier.clone());

        session.dispatcher().on_command("export-html");
        let report = session.finish().await.unwrap();

        assert!(report.saved.is_empty());
        assert_eq!(report.outcomes, vec![Outcome::Empty]);
        assert_eq!(notifier.notices(), vec![EMPTY_CONVERSATION_NOTICE.to_string()]);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_command_is_ignored() {
        let temp = TempDir::new().unwrap();
        let session = start("conversation.html", temp.path(), Arc::default());

        assert_eq!(session.dispatcher().on_command("reload-extension"), None);
        let report = session.finish().await.unwrap();

        assert!(report.outcomes.is_empty());
        assert!(report.saved.is_empty());
    }
}
