#![forbid(unsafe_code)]

use crate::flags::PermissionState;
use clap::{Args, Parser, Subcommand};
use lt_core::{FaviconProvider, IconBorder, Theme};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EXTENSION_BASE: &str = "chrome-extension://linktree";
/// Upper bound applied to both `--debounce-ms` and `--poll-ms`.
pub const MAX_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Parser)]
#[command(name = "linktree", version, about = "Organize named links into a tree")]
pub struct Cli {
    #[command(flatten)]
    pub config: AppConfig,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Args)]
pub struct AppConfig {
    /// Directory holding the synchronized store
    #[arg(long, env = "LINKTREE_STORAGE_DIR", default_value = ".linktree", global = true)]
    pub storage_dir: PathBuf,
    /// Name this process writes under; other names are other devices
    #[arg(long, env = "LINKTREE_DEVICE", default_value = "local", global = true)]
    pub device: String,
    /// Quiet period before a burst of external changes is applied
    #[arg(long, env = "LINKTREE_DEBOUNCE_MS", default_value_t = 50, global = true)]
    pub debounce_ms: u64,
    /// How often `watch` checks for external changes
    #[arg(long, default_value_t = 200, global = true)]
    pub poll_ms: u64,
    /// Origin serving the browser's favicon cache
    #[arg(long, default_value = DEFAULT_EXTENSION_BASE, global = true)]
    pub extension_base: String,
    #[arg(long, value_enum, default_value_t = PermissionState::Granted, global = true)]
    pub favicon_permission: PermissionState,
    /// Log filter, e.g. `info` or `lt_core=debug`
    #[arg(long, env = "LINKTREE_LOG", default_value = "warn", global = true)]
    pub log: String,
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.min(MAX_INTERVAL_MS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.clamp(1, MAX_INTERVAL_MS))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a link, or a folder when no URL is given
    Add {
        name: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, value_parser = parse_provider)]
        icon: Option<FaviconProvider>,
        #[arg(long, value_parser = parse_border)]
        border: Option<IconBorder>,
    },
    /// Remove a record; its children move to the top level
    Rm { name: String },
    /// Change a record's fields
    Edit {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long, conflicts_with = "clear_url")]
        url: Option<String>,
        #[arg(long)]
        clear_url: bool,
        #[arg(long, conflicts_with = "clear_parent")]
        parent: Option<String>,
        #[arg(long)]
        clear_parent: bool,
        #[arg(long, value_parser = parse_provider)]
        icon: Option<FaviconProvider>,
        #[arg(long, value_parser = parse_border)]
        border: Option<IconBorder>,
    },
    /// Flip a record's completion mark
    Toggle {
        name: String,
        /// Go through the context-menu shortcut, which settings can disable
        #[arg(long)]
        context: bool,
    },
    /// Move a record above its previous sibling
    Up { name: String },
    /// Move a record below its next sibling
    Down { name: String },
    /// Print the tree
    Show {
        #[arg(long, conflicts_with = "json")]
        columns: bool,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        icons: bool,
    },
    /// Print or change settings
    Settings {
        #[arg(long, value_parser = parse_provider)]
        provider: Option<FaviconProvider>,
        #[arg(long)]
        right_click: Option<bool>,
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
    },
    /// Print storage usage of the list
    Usage,
    /// Re-render whenever another device changes the list
    Watch {
        #[arg(long)]
        columns: bool,
        /// Exit after this many reconciliations
        #[arg(long)]
        max_passes: Option<u64>,
    },
}

fn parse_provider(value: &str) -> Result<FaviconProvider, String> {
    FaviconProvider::parse(value).ok_or_else(|| format!("unknown provider {value:?} (chrome, duck, gen, none)"))
}

fn parse_border(value: &str) -> Result<IconBorder, String> {
    match value.trim() {
        "0" => Ok(IconBorder::Hidden),
        "1" => Ok(IconBorder::Shown),
        other => Err(format!("border must be 0 or 1, got {other:?}")),
    }
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    Theme::parse(value).ok_or_else(|| format!("unknown theme {value:?} (light, dark, system)"))
}
