//! Command Dispatcher - routes user commands to the active tab.
//!
//! A command (keyboard shortcut, popup click) becomes exactly one message to
//! exactly one tab. Missing tabs and unreachable pages are logged and absorbed:
//! the user simply triggers the command again once the page is ready.

use crate::runtime::{RuntimeMessage, TabId, Tabs};
use crate::snapshot::{ExportFormat, ExportRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// User-facing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ExportHtml,
    ExportMarkdown,
    PrintChat,
}

impl Command {
    /// Parse a command name. `export-chat` is the older name of `export-html`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "export-html" | "export-chat" => Some(Command::ExportHtml),
            "export-markdown" => Some(Command::ExportMarkdown),
            "print-chat" => Some(Command::PrintChat),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::ExportHtml => "export-html",
            Command::ExportMarkdown => "export-markdown",
            Command::PrintChat => "print-chat",
        }
    }

    pub fn request(&self) -> ExportRequest {
        match self {
            Command::ExportHtml => ExportRequest::export(ExportFormat::Html),
            Command::ExportMarkdown => ExportRequest::export(ExportFormat::Markdown),
            Command::PrintChat => ExportRequest::print(),
        }
    }
}

/// Result of one dispatch. Never an error: failures are absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent(TabId),
    NoActiveTab,
    Failed(TabId),
}

/// Background command dispatcher.
#[derive(Clone)]
pub struct CommandDispatcher {
    tabs: Arc<dyn Tabs>,
}

impl CommandDispatcher {
    pub fn new(tabs: Arc<dyn Tabs>) -> Self {
        Self { tabs }
    }

    /// Handle a raw command name. Unknown names are ignored.
    pub fn on_command(&self, name: &str) -> Option<Delivery> {
        match Command::parse(name) {
            Some(command) => Some(self.dispatch(command)),
            None => {
                debug!(command = name, "Ignoring unknown command");
                None
            }
        }
    }

    /// Deliver the command's request to the active tab.
    pub fn dispatch(&self, command: Command) -> Delivery {
        let Some(tab) = self.tabs.active_tab() else {
            warn!(command = command.name(), "No active tab to export from");
            return Delivery::NoActiveTab;
        };

        let message = RuntimeMessage::from(command.request());
        match self.tabs.send(tab, message) {
            Ok(()) => {
                info!(command = command.name(), tab, "Dispatched export request");
                Delivery::Sent(tab)
            }
            Err(e) => {
                warn!(
                    command = command.name(),
                    tab,
                    error = %e,
                    "Could not reach the page; is it fully loaded?"
                );
                Delivery::Failed(tab)
            }
        }
    }
}

/// Popup trigger affordances. Each click issues the same command as its
/// keyboard shortcut.
#[derive(Clone)]
pub struct Popup {
    dispatcher: CommandDispatcher,
}

impl Popup {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn click_export_html(&self) -> Delivery {
        self.dispatcher.dispatch(Command::ExportHtml)
    }

    pub fn click_export_markdown(&self) -> Delivery {
        self.dispatcher.dispatch(Command::ExportMarkdown)
    }

    pub fn click_print(&self) -> Delivery {
        self.dispatcher.dispatch(Command::PrintChat)
    }
}

/// In-page keyboard fallback: key combo -> command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBindings {
    bindings: BTreeMap<String, Command>,
}

impl KeyBindings {
    /// Build from the config table. Entries naming unknown commands are skipped.
    pub fn from_config(table: &BTreeMap<String, String>) -> Self {
        let mut bindings = BTreeMap::new();
        for (combo, name) in table {
            match Command::parse(name) {
                Some(command) => {
                    bindings.insert(normalize_combo(combo), command);
                }
                None => warn!(combo = %combo, command = %name, "Skipping unknown key binding"),
            }
        }
        Self { bindings }
    }

    pub fn resolve(&self, combo: &str) -> Option<Command> {
        self.bindings.get(&normalize_combo(combo)).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Canonical key combo: lowercase, modifiers in a fixed order, key last.
pub fn normalize_combo(combo: &str) -> String {
    const MODIFIERS: [&str; 4] = ["ctrl", "alt", "shift", "meta"];

    let mut modifiers = Vec::new();
    let mut keys = Vec::new();
    for part in combo.split('+').map(|p| p.trim().to_lowercase()) {
        let part = match part.as_str() {
            "control" => "ctrl".to_string(),
            "cmd" | "command" | "super" => "meta".to_string(),
            "option" => "alt".to_string(),
            other => other.to_string(),
        };
        if part.is_empty() {
            continue;
        }
        if MODIFIERS.contains(&part.as_str()) {
            if !modifiers.contains(&part) {
                modifiers.push(part);
            }
        } else {
            keys.push(part);
        }
    }

    modifiers.sort_by_key(|m| MODIFIERS.iter().position(|x| *x == m.as_str()));
    modifiers.extend(keys);
    modifiers.join("+")
}
