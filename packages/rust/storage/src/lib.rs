//! Notebook archive on embedded libSQL.
//!
//! Original notebook bytes are stored under their notebook document id so a
//! search hit can be traced back to the exact file that was indexed.
//!
//! **Access rules:**
//! - `nbindex update`: read-write via [`Storage::open`]
//! - `nbindex fetch`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::future::Future;
use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use nbindex_shared::{NbIndexError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Blob store for original notebook bytes, keyed by notebook id.
pub trait NotebookArchive: Send + Sync {
    /// Store `content` under `id`, replacing any previous entry.
    fn put(&self, id: &str, content: &[u8]) -> impl Future<Output = Result<()>>;

    /// Fetch the bytes stored under `id`.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Vec<u8>>>>;
}

/// Metadata of one archived notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    pub content_hash: String,
    pub size: u64,
    pub archived_at: String,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> NbIndexError {
    NbIndexError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NbIndexError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` without write access.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NbIndexError::Storage(format!(
                "archive not found: {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    NbIndexError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(NbIndexError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Notebook operations
    // -----------------------------------------------------------------------

    /// Insert or replace the archived bytes for `id`.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn put_notebook(&self, id: &str, content: &[u8]) -> Result<()> {
        self.check_writable()?;
        let hash = content_hash(content);
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO notebooks (id, content, content_hash, size, archived_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                   content = excluded.content,
                   content_hash = excluded.content_hash,
                   size = excluded.size,
                   archived_at = excluded.archived_at",
                params![
                    id,
                    content.to_vec(),
                    hash.as_str(),
                    content.len() as i64,
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;

        debug!(%hash, "notebook archived");
        Ok(())
    }

    /// Archived bytes for `id`, if present.
    pub async fn get_notebook(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let mut rows = self
            .conn
            .query("SELECT content FROM notebooks WHERE id = ?1", params![id])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row.get::<Vec<u8>>(0).map_err(storage_err)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Metadata for `id` without loading the content.
    pub async fn get_entry(&self, id: &str) -> Result<Option<ArchiveEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, content_hash, size, archived_at FROM notebooks WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(ArchiveEntry {
                id: row.get::<String>(0).map_err(storage_err)?,
                content_hash: row.get::<String>(1).map_err(storage_err)?,
                size: row.get::<i64>(2).map_err(storage_err)?.max(0) as u64,
                archived_at: row.get::<String>(3).map_err(storage_err)?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Number of archived notebooks.
    pub async fn count_notebooks(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM notebooks", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)?.max(0) as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }
}

impl NotebookArchive for Storage {
    async fn put(&self, id: &str, content: &[u8]) -> Result<()> {
        self.put_notebook(id, content).await
    }

    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.get_notebook(id).await
    }
}

/// SHA-256 of `content`, lowercase hex.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
