//! Config module - Manages chat-printer configuration (config.toml).
//!
//! Configuration file contains:
//! - Selector fallback chain and strip selectors used by the extractor
//! - Print preview behavior
//! - Export output directory and default format
//! - In-page keyboard fallback bindings

use crate::snapshot::ExportFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default document title when the page has none.
pub const DEFAULT_TITLE: &str = "ChatGPT Conversation";

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Message selectors, tried in priority order until one matches
    #[serde(default = "default_selectors")]
    pub selectors: Vec<String>,

    /// Interactive elements removed from every cloned message
    #[serde(default = "default_strip_selectors")]
    pub strip_selectors: Vec<String>,

    /// Title used when the page has no `<title>`
    #[serde(default = "default_title")]
    pub default_title: String,
}

fn default_selectors() -> Vec<String> {
    vec![
        r#"article[data-testid*="conversation-turn"]"#.to_string(),
        "div[data-message-id]".to_string(),
        "[data-message-author-role]".to_string(),
        "div.group.w-full".to_string(),
    ]
}

fn default_strip_selectors() -> Vec<String> {
    vec![
        "button".to_string(),
        r#"[data-testid*="copy"]"#.to_string(),
        ".copy-button".to_string(),
        r#"[aria-label*="Copy"]"#.to_string(),
    ]
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            selectors: default_selectors(),
            strip_selectors: default_strip_selectors(),
            default_title: default_title(),
        }
    }
}

/// Print preview configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintConfig {
    /// Open the print dialog automatically once the preview loads
    #[serde(default = "default_true")]
    pub auto_print: bool,

    /// Delay before the print dialog is invoked
    #[serde(default = "default_print_delay_ms")]
    pub print_delay_ms: u64,

    /// Close the preview window after printing
    #[serde(default = "default_true")]
    pub auto_close: bool,

    /// Feature string passed to the window opener
    #[serde(default = "default_window_features")]
    pub window_features: String,
}

fn default_true() -> bool {
    true
}

fn default_print_delay_ms() -> u64 {
    500
}

fn default_window_features() -> String {
    "width=800,height=600,scrollbars=yes,resizable=yes".to_string()
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            auto_print: true,
            print_delay_ms: default_print_delay_ms(),
            auto_close: true,
            window_features: default_window_features(),
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Directory downloads are written to (default: the user's download dir)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Format used when a request does not name one
    #[serde(default)]
    pub default_format: ExportFormat,
}

/// Main chat-printer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config version (for future migrations)
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub print: PrintConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// Key combo -> command name (e.g. "Ctrl+Shift+M" = "export-markdown")
    #[serde(default = "default_keybindings")]
    pub keybindings: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}

fn default_keybindings() -> BTreeMap<String, String> {
    let mut bindings = BTreeMap::new();
    bindings.insert("Ctrl+Shift+H".to_string(), "export-html".to_string());
    bindings.insert("Ctrl+Shift+M".to_string(), "export-markdown".to_string());
    bindings.insert("Ctrl+M".to_string(), "print-chat".to_string());
    bindings
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            extraction: ExtractionConfig::default(),
            print: PrintConfig::default(),
            export: ExportConfig::default(),
            keybindings: default_keybindings(),
        }
    }
}

/// Get default config directory (~/.config/chat-printer/).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("chat-printer"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get default download directory.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Create new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from default path.
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Directory exports are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(default_output_dir)
    }
}
