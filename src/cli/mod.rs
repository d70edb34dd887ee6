pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tributary",
    version,
    about = "Browse, search and resolve stream links across the supported sites"
)]
pub struct Cli {
    /// Path to config.toml (default: ~/.config/tributary/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the supported sites
    Sites,
    /// List a site's main-page sections
    Sections { site: String },
    /// Browse one main-page section
    Browse {
        site: String,
        section: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search a site
    Search { site: String, query: String },
    /// Show details and episodes for a content page
    Show { site: String, url: String },
    /// Resolve playable stream links for a content/episode page
    Links { site: String, url: String },
}
