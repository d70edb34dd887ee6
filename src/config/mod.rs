//! Configuration: fetch defaults, fan-out width, and per-site base-URL
//! overrides.
//!
//! The scraped sites rotate domains constantly; the originals patched a
//! mutable `mainUrl` field at runtime for this. Here the replacement
//! domain comes from config and is baked into the site descriptor at
//! construction, read-only afterwards.
//!
//! Loaded from `~/.config/tributary/config.toml` when present:
//!
//! ```toml
//! [fetch]
//! timeout_secs = 20
//!
//! [sites.gomov]
//! base_url = "https://gomov.example"
//!
//! [sites.layarkaca.extra]
//! series_url = "https://nd.example"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::{Result, TributaryError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub pipeline: PipelineConfig,
    pub sites: BTreeMap<String, SiteOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            pipeline: PipelineConfig::default(),
            sites: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: 15,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent resolution chains per page.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 8 }
    }
}

/// Per-site URL overrides. `extra` carries a site's secondary hosts
/// (series domain, player server, image CDN) keyed by the names the site
/// module documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteOverride {
    pub base_url: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl SiteOverride {
    pub fn base(&self, default: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| default.to_string())
    }

    pub fn extra(&self, key: &str, default: &str) -> String {
        self.extra
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

impl Config {
    /// Load from `path`, or from the default location. A missing file is
    /// the default config; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        toml::from_str(&raw)
            .map_err(|e| TributaryError::Config(format!("{}: {e}", path.display())))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tributary").join("config.toml"))
    }

    /// Override block for one site, default when absent.
    pub fn site(&self, name: &str) -> SiteOverride {
        self.sites.get(name).cloned().unwrap_or_default()
    }
}
