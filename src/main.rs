//! chat-printer CLI - Export chat conversations to HTML, Markdown or print.
//!
//! Usage:
//!   chat-printer export <PAGE>     - Save the conversation as a file
//!   chat-printer print <PAGE>      - Open a print preview in the browser
//!   chat-printer selectors         - Show the selector chain
//!   chat-printer config init|show  - Manage the config file

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("chat_printer={}", log_level).parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Export {
            page,
            format,
            url,
            output,
        } => cli::commands::export(config, &page, format, url, output).await,
        Commands::Print {
            page,
            url,
            no_auto_print,
        } => cli::commands::print(config, &page, url, no_auto_print).await,
        Commands::Selectors { page } => cli::commands::selectors(config, page.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => cli::commands::config_init(config, force),
            ConfigAction::Show => cli::commands::config_show(config),
        },
    }
}
