//! Notebook sources: where notebooks are discovered and read from.
//!
//! [`LocalSource`] walks a directory tree. Hidden entries are skipped, and a
//! `.nbsearchignore` file in any directory excludes matching paths in that
//! directory and everything below it.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use nbindex_shared::{Attributes, NbIndexError, Result, SourceConfig};

/// Per-directory ignore file name.
pub const IGNORE_FILE_NAME: &str = ".nbsearchignore";

const NOTEBOOK_EXTENSION: &str = "ipynb";

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// One notebook file reported by a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub server: String,
    /// Path relative to the source root, `/`-separated.
    pub path: String,
    pub owner: Option<String>,
    pub mtime: Option<String>,
    pub ctime: Option<String>,
    pub atime: Option<String>,
}

impl SourceFile {
    /// The non-empty attributes recorded for this file.
    pub fn attributes(&self) -> Attributes {
        let fields = [
            ("server", Some(&self.server)),
            ("owner", self.owner.as_ref()),
            ("mtime", self.mtime.as_ref()),
            ("ctime", self.ctime.as_ref()),
            ("atime", self.atime.as_ref()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.to_string(), v.clone()))
            })
            .collect()
    }
}

/// Enumerates notebooks and reads their raw bytes.
pub trait Source: Send + Sync {
    fn list_files(&self) -> Result<Vec<SourceFile>>;

    /// Read the notebook at `path` on `server`.
    fn read_notebook(&self, server: &str, path: &str) -> Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// LocalSource
// ---------------------------------------------------------------------------

/// Notebooks below a local directory.
#[derive(Debug, Clone)]
pub struct LocalSource {
    base_dir: PathBuf,
    server: String,
    owner: Option<String>,
    owner_pattern: Option<Regex>,
}

impl LocalSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let owner_pattern = config
            .owner_pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| {
                // anchored at the start of the path only
                Regex::new(&format!("^(?:{p})")).map_err(|e| {
                    NbIndexError::config(format!("invalid owner_pattern {p:?}: {e}"))
                })
            })
            .transpose()?;

        if let Some(pattern) = &owner_pattern {
            if !pattern.capture_names().flatten().any(|n| n == "owner") {
                return Err(NbIndexError::config(
                    "owner_pattern must define a named group `owner`",
                ));
            }
        }

        Ok(Self {
            base_dir: PathBuf::from(&config.base_dir),
            server: config.server.clone(),
            owner: config.owner.clone().filter(|o| !o.is_empty()),
            owner_pattern,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Owner of the file at `actual_path`: the fixed owner if configured,
    /// else the `owner` capture of the pattern.
    fn owner_of(&self, actual_path: &Path) -> Option<String> {
        if let Some(owner) = &self.owner {
            return Some(owner.clone());
        }
        let pattern = self.owner_pattern.as_ref()?;
        let path = actual_path.to_string_lossy();
        let captures = pattern.captures(&path)?;
        captures.name("owner").map(|m| m.as_str().to_string())
    }

    fn relative_path(&self, actual_path: &Path) -> Option<String> {
        let relative = actual_path.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl Source for LocalSource {
    #[instrument(skip_all, fields(base_dir = %self.base_dir.display()))]
    fn list_files(&self) -> Result<Vec<SourceFile>> {
        if !self.base_dir.is_dir() {
            return Err(NbIndexError::validation(format!(
                "source directory does not exist: {}",
                self.base_dir.display()
            )));
        }

        let walker = WalkBuilder::new(&self.base_dir)
            .standard_filters(false)
            .hidden(true)
            .add_custom_ignore_filename(IGNORE_FILE_NAME)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let actual_path = entry.path();
            if !is_notebook(actual_path) {
                debug!(path = %actual_path.display(), "ignore file that is not a notebook");
                continue;
            }
            let Some(path) = self.relative_path(actual_path) else {
                continue;
            };

            let metadata =
                std::fs::metadata(actual_path).map_err(|e| NbIndexError::io(actual_path, e))?;

            files.push(SourceFile {
                server: self.server.clone(),
                path,
                owner: self.owner_of(actual_path),
                mtime: metadata.modified().ok().map(format_time),
                ctime: change_time(&metadata),
                atime: metadata.accessed().ok().map(format_time),
            });
        }

        info!(count = files.len(), "notebooks discovered");
        Ok(files)
    }

    fn read_notebook(&self, server: &str, path: &str) -> Result<Vec<u8>> {
        if server != self.server {
            return Err(NbIndexError::notebook(
                path,
                format!("server {server:?} is not served by this source ({:?})", self.server),
            ));
        }
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(NbIndexError::notebook(path, "path escapes the source directory"));
        }

        let actual = self.base_dir.join(relative);
        std::fs::read(&actual).map_err(|e| NbIndexError::io(actual, e))
    }
}

fn is_notebook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(NOTEBOOK_EXTENSION))
}

/// RFC 3339 in UTC with second precision, e.g. `2024-01-02T03:04:05Z`.
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(unix)]
fn change_time(metadata: &std::fs::Metadata) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    DateTime::<Utc>::from_timestamp(metadata.ctime(), 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(not(unix))]
fn change_time(metadata: &std::fs::Metadata) -> Option<String> {
    metadata.created().ok().map(format_time)
}
