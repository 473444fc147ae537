//! Versioned schema for the notebook archive.
//!
//! Applied in ascending order on [`crate::Storage::open`]; each entry records
//! itself in `schema_migrations`.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: notebooks archive",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Original notebook bytes keyed by notebook document id
CREATE TABLE IF NOT EXISTS notebooks (
    id           TEXT PRIMARY KEY,
    content      BLOB NOT NULL,
    content_hash TEXT NOT NULL,
    size         INTEGER NOT NULL,
    archived_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notebooks_hash ON notebooks(content_hash);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
