//! Shared types, error model, and configuration for nbindex.
//!
//! This crate is the foundation depended on by all other nbindex crates.
//! It provides:
//! - [`NbIndexError`] — the unified error type
//! - The notebook data model ([`Notebook`], [`Cell`], [`CellMeme`], ...)
//! - Search document types ([`Document`], [`FieldValue`], [`DocumentSet`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod notebook;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ArchiveConfig, SolrConfig, SourceConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{NbIndexError, Result};
pub use notebook::{
    Cell, CellMeme, CellMetadata, CellType, Multiline, Notebook, NotebookMeme,
    NotebookMetadata, Output, ServerSignature, SignatureRecord,
};
pub use types::{Attributes, Document, DocumentSet, FieldValue, IndexKind, field_root};
