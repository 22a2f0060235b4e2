//! HTML Formatter
//!
//! Produces a self-contained document: embedded screen and print styles, a
//! metadata block and the sanitized message markup. Print mode also embeds the
//! auto-print script (or a visible print button when auto-print is off).

use super::document::{Document, Element};
use super::{format_timestamp, Formatter};
use crate::config::PrintConfig;
use crate::error::Result;
use crate::snapshot::{ChatSnapshot, ExportFormat};

const BASE_STYLES: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Arial, sans-serif; line-height: 1.6; max-width: 900px; margin: 2em auto; padding: 0 1em; color: #222; }
h1 { font-size: 1.6em; border-bottom: 2px solid #eee; padding-bottom: 0.3em; }
.metadata { margin-bottom: 2em; font-size: 0.9em; color: #666; }
.message { margin-bottom: 1em; padding: 1em; border-left: 3px solid #ddd; }
code { background-color: #f4f4f4; padding: 2px 4px; border-radius: 3px; font-family: 'Courier New', monospace; }
pre { background-color: #f4f4f4; padding: 1em; border-radius: 5px; overflow-x: auto; font-family: 'Courier New', monospace; white-space: pre-wrap; }
pre code { background-color: transparent; padding: 0; }
table { border-collapse: collapse; width: 100%; margin: 1em 0; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
img, svg { max-width: 100%; }
.print-actions { margin-bottom: 1em; }
"#;

const PRINT_STYLES: &str = r#"
@media print {
  body { font-size: 12pt; max-width: none; margin: 0; padding: 0; color: #000; }
  @page { margin: 0.5in; }
  .message { page-break-inside: avoid; break-inside: avoid; border-left-color: #999; }
  pre, table, blockquote { page-break-inside: avoid; }
  a { color: #000; text-decoration: none; }
  .no-print { display: none !important; }
}
"#;

/// Print preview behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub auto_print: bool,
    pub delay_ms: u64,
    pub auto_close: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self::from(&PrintConfig::default())
    }
}

impl From<&PrintConfig> for PrintOptions {
    fn from(config: &PrintConfig) -> Self {
        Self {
            auto_print: config.auto_print,
            delay_ms: config.print_delay_ms,
            auto_close: config.auto_close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Export,
    Print(PrintOptions),
}

/// HTML formatter for downloads and print previews.
#[derive(Debug, Clone, Copy)]
pub struct HtmlFormatter {
    mode: Mode,
}

impl HtmlFormatter {
    pub fn export() -> Self {
        Self { mode: Mode::Export }
    }

    pub fn print(options: PrintOptions) -> Self {
        Self {
            mode: Mode::Print(options),
        }
    }

    fn print_script(options: &PrintOptions) -> Option<String> {
        let mut script = String::new();
        if options.auto_print {
            script.push_str(&format!(
                "window.addEventListener('load', function () {{\n  setTimeout(function () {{ window.focus(); window.print(); }}, {});\n}});\n",
                options.delay_ms
            ));
        }
        if options.auto_close {
            script.push_str("window.addEventListener('afterprint', function () { window.close(); });\n");
        }
        (!script.is_empty()).then_some(script)
    }
}

/// Link only web locations; anything else is shown as plain text.
fn source_node(url: &str) -> Element {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Element::new("a")
            .attr("href", url)
            .attr("target", "_blank")
            .attr("rel", "noopener noreferrer")
            .text(url)
    } else {
        Element::new("span").text(url)
    }
}

impl Formatter for HtmlFormatter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn render(&self, snapshot: &ChatSnapshot) -> Result<String> {
        let styles = format!("{}{}", BASE_STYLES, PRINT_STYLES);

        let mut doc = Document::new("en")
            .head(Element::new("meta").attr("charset", "UTF-8"))
            .head(
                Element::new("meta")
                    .attr("name", "viewport")
                    .attr("content", "width=device-width, initial-scale=1.0"),
            )
            .head(
                Element::new("meta")
                    .attr("name", "source-url")
                    .attr("content", snapshot.url()),
            )
            .head(
                Element::new("meta")
                    .attr("name", "exported-at")
                    .attr("content", snapshot.timestamp().to_rfc3339()),
            )
            .head(Element::new("title").text(snapshot.title()))
            .head(Element::new("style").raw(styles));

        if let Mode::Print(options) = &self.mode {
            if !options.auto_print {
                doc = doc.body(
                    Element::new("div").class("no-print print-actions").child(
                        Element::new("button")
                            .attr("type", "button")
                            .attr("onclick", "window.print()")
                            .text("Print / Save as PDF"),
                    ),
                );
            }
        }

        doc = doc
            .body(Element::new("h1").text(snapshot.title()))
            .body(
                Element::new("div")
                    .class("metadata")
                    .child(
                        Element::new("p")
                            .child(Element::new("strong").text("Exported from:"))
                            .text(" ")
                            .child(source_node(snapshot.url())),
                    )
                    .child(
                        Element::new("p")
                            .child(Element::new("strong").text("Timestamp:"))
                            .text(format!(" {}", format_timestamp(snapshot.timestamp()))),
                    ),
            )
            .body(
                Element::new("div")
                    .class("chat-export")
                    .raw(snapshot.content()),
            );

        if let Mode::Print(options) = &self.mode {
            if let Some(script) = Self::print_script(options) {
                doc = doc.body(Element::new("script").raw(script));
            }
        }

        Ok(doc.render())
    }
}
