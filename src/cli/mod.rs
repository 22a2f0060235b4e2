//! CLI definitions and command implementations for chat-printer.

pub mod commands;

use chat_printer::ExportFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chat-printer - Export the visible chat thread of a conversation page
#[derive(Parser)]
#[command(name = "chat-printer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/chat-printer/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export a saved conversation page to a file
    Export {
        /// Saved HTML page of the conversation
        page: PathBuf,

        /// Output format (default: from config)
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Location the page was loaded from
        #[arg(short, long)]
        url: Option<String>,

        /// Directory to write the export to (default: downloads folder)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Open a print preview of a saved conversation page in the browser
    Print {
        /// Saved HTML page of the conversation
        page: PathBuf,

        /// Location the page was loaded from
        #[arg(short, long)]
        url: Option<String>,

        /// Show a print button instead of opening the print dialog
        #[arg(long)]
        no_auto_print: bool,
    },

    /// List the selector chain, optionally evaluated against a page
    Selectors {
        /// Saved HTML page to test the selectors against
        #[arg(short, long)]
        page: Option<PathBuf>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config
    Show,
}
