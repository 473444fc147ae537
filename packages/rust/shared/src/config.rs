//! Application configuration for nbindex.
//!
//! User config lives at `~/.nbindex/nbindex.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NbIndexError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "nbindex.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".nbindex";

// ---------------------------------------------------------------------------
// Config structs (matching nbindex.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search backend settings.
    #[serde(default)]
    pub solr: SolrConfig,

    /// Where notebooks are discovered.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where original notebook bytes are archived.
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// `[solr]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolrConfig {
    /// Base URL of the Solr server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Core receiving cell-level documents.
    #[serde(default = "default_cell_core")]
    pub cell_core: String,

    /// Core receiving notebook-level documents.
    #[serde(default = "default_notebook_core")]
    pub notebook_core: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cell_core: default_cell_core(),
            notebook_core: default_notebook_core(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8983".into()
}
fn default_cell_core() -> String {
    "jupyter-cell".into()
}
fn default_notebook_core() -> String {
    "jupyter-notebook".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root directory scanned for notebooks.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Server address recorded on every discovered file.
    #[serde(default)]
    pub server: String,

    /// Fixed owner for every file; takes precedence over `owner_pattern`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Regex with a named `owner` group, matched against the file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_pattern: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            server: String::new(),
            owner: None,
            owner_pattern: None,
        }
    }
}

fn default_base_dir() -> String {
    ".".into()
}

/// `[archive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Path to the archive database.
    #[serde(default = "default_archive_path")]
    pub db_path: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            db_path: default_archive_path(),
        }
    }
}

fn default_archive_path() -> String {
    "~/.nbindex/archive.db".into()
}

impl ArchiveConfig {
    /// Resolve `db_path`, expanding a leading `~/` to the home directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    NbIndexError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.db_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.nbindex/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NbIndexError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.nbindex/nbindex.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NbIndexError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        NbIndexError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NbIndexError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NbIndexError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NbIndexError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
