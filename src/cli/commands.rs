//! Command implementations for the chat-printer CLI.
//!
//! Main commands:
//! - export: run one export through a full session and report the saved file
//! - print: render the print preview and open it in the browser
//! - selectors: show which selector of the chain matches a page
//! - config: write or show the config file

use anyhow::{bail, Context, Result};
use chat_printer::config::{default_config_path, Config};
use chat_printer::content::{Notifier, Outcome, PrintWindow, WindowOpener};
use chat_printer::dispatcher::{Command, Delivery};
use chat_printer::downloads::DirectoryDownloads;
use chat_printer::extractors::{Page, SelectorChain};
use chat_printer::utils::browser::{file_url, open_browser};
use chat_printer::{ExportFormat, ExportSession};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prints notices to the terminal.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message.yellow());
    }
}

const PREVIEW_PREFIX: &str = "chat-print-";

/// Previews older than this are removed on the next `print` run. The browser
/// may still be loading the newest ones, so they are never deleted right away.
const PREVIEW_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Remove `chat-print-*.html` previews in `dir` last modified at least
/// `max_age` ago. Returns how many were removed.
fn prune_stale_previews(dir: &Path, max_age: Duration) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Cannot scan for stale previews");
            return 0;
        }
    };
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_preview = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(PREVIEW_PREFIX) && name.ends_with(".html"));
        if !is_preview {
            continue;
        }

        let stale = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= max_age);
        if !stale {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot remove stale preview"),
        }
    }

    removed
}

/// Print windows backed by temporary HTML files opened in the default browser.
#[derive(Default)]
struct BrowserWindowOpener {
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl BrowserWindowOpener {
    fn opened(&self) -> Vec<PathBuf> {
        self.opened
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

impl WindowOpener for BrowserWindowOpener {
    fn open(&self, features: &str) -> Option<Box<dyn PrintWindow>> {
        let path = std::env::temp_dir()
            .join(format!("{}{}.html", PREVIEW_PREFIX, Uuid::new_v4()));
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot create print preview");
                return None;
            }
        };
        debug!(path = %path.display(), features, "Opened print preview file");

        if let Ok(mut opened) = self.opened.lock() {
            opened.push(path.clone());
        }
        Some(Box::new(BrowserWindow {
            path,
            writer: Some(BufWriter::new(file)),
        }))
    }
}

struct BrowserWindow {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl PrintWindow for BrowserWindow {
    fn write(&mut self, html: &str) -> chat_printer::Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(html.as_bytes())?;
        }
        Ok(())
    }

    fn close_document(&mut self) -> chat_printer::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn focus(&mut self) {
        if !open_browser(&file_url(&self.path)) {
            warn!(path = %self.path.display(), "Could not launch a browser");
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}

fn load_page(path: &Path, url: Option<String>) -> Result<Page> {
    Page::from_file(path, url).with_context(|| format!("Cannot read page: {}", path.display()))
}

/// Run a single command through a full session and return what it did.
async fn run_session(
    page: Page,
    config: &Config,
    output_dir: &Path,
    windows: Arc<dyn WindowOpener>,
    command: Command,
) -> Result<(Vec<Outcome>, Vec<PathBuf>)> {
    let session = ExportSession::start(
        page,
        config,
        Arc::new(DirectoryDownloads::new(output_dir)),
        Arc::new(TerminalNotifier),
        windows,
    )?;

    let delivery = session.dispatcher().dispatch(command);
    if !matches!(delivery, Delivery::Sent(_)) {
        bail!("Could not deliver {} to the page", command.name());
    }

    let report = session.finish().await?;
    if report.live_object_urls > 0 {
        warn!(count = report.live_object_urls, "Object URLs left unreleased");
    }
    Ok((report.outcomes, report.saved))
}

/// Export a saved page to HTML or Markdown
pub async fn export(
    config_path: Option<&Path>,
    page: &Path,
    format: Option<ExportFormat>,
    url: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let format = format.unwrap_or(config.export.default_format);
    let output_dir = output.unwrap_or_else(|| config.output_dir());
    let command = match format {
        ExportFormat::Html => Command::ExportHtml,
        ExportFormat::Markdown => Command::ExportMarkdown,
    };

    println!(
        "{} {} as {}...",
        "Exporting".cyan(),
        page.display(),
        format.to_string().bold()
    );

    let page = load_page(page, url)?;
    let (outcomes, saved) = run_session(
        page,
        &config,
        &output_dir,
        Arc::new(BrowserWindowOpener::default()),
        command,
    )
    .await?;

    if saved.is_empty() {
        bail!("Nothing was exported");
    }
    for path in &saved {
        println!("  {} {}", "✓".green(), path.display().to_string().white().bold());
    }
    debug!(outcomes = ?outcomes, "Export finished");

    Ok(())
}

/// Render a print preview and open it in the browser
pub async fn print(
    config_path: Option<&Path>,
    page: &Path,
    url: Option<String>,
    no_auto_print: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if no_auto_print {
        config.print.auto_print = false;
    }

    println!("{} {}...", "Preparing print preview for".cyan(), page.display());

    let pruned = prune_stale_previews(&std::env::temp_dir(), PREVIEW_MAX_AGE);
    if pruned > 0 {
        debug!(count = pruned, "Removed stale print previews");
    }

    let page = load_page(page, url)?;
    let opener = Arc::new(BrowserWindowOpener::default());
    let (outcomes, _) = run_session(
        page,
        &config,
        &std::env::temp_dir(),
        opener.clone(),
        Command::PrintChat,
    )
    .await?;

    if !outcomes.contains(&Outcome::PrintOpened) {
        bail!("Print preview was not opened");
    }
    for path in opener.opened() {
        println!("  {} {}", "✓".green(), path.display().to_string().white().bold());
    }

    Ok(())
}

/// List the selector chain and, given a page, how many nodes each selector matches
pub fn selectors(config_path: Option<&Path>, page: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let chain = SelectorChain::new(&config.extraction.selectors)?;

    let Some(page) = page else {
        println!("{}", "Selector chain (first match wins):".cyan());
        for (idx, strategy) in chain.strategies().iter().enumerate() {
            println!("  {}. {}", (idx + 1).to_string().cyan(), strategy.source());
        }
        return Ok(());
    };

    let document = load_page(page, None)?.document();
    let counts = chain.match_counts(&document);
    let winner = counts.iter().position(|(_, count)| *count > 0);

    println!("{} {}:\n", "Selector matches for".cyan(), page.display());
    for (idx, (selector, count)) in counts.iter().enumerate() {
        let marker = if Some(idx) == winner {
            "✓".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {} {}. {} [{}]",
            marker,
            (idx + 1).to_string().cyan(),
            selector,
            format!("{} nodes", count).dimmed()
        );
    }

    if winner.is_none() {
        println!("\n{}", "No selector matched this page.".yellow());
    }
    println!();
    Ok(())
}

/// Write the default config file
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(&path)?;
    println!("{} {}", "✓ Config written to".green(), path.display());
    Ok(())
}

/// Print the effective config as TOML
pub fn config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let content = toml::to_string_pretty(&config).context("Cannot serialize config to TOML")?;
    print!("{}", content);
    Ok(())
}
