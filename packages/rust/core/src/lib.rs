//! Notebook to search-document transformation and the indexing pipeline.
//!
//! The transformation ([`assemble`]) is pure: it derives a stable notebook
//! id, extracts markdown fields, computes per-cell meme chains, and folds
//! cells into a notebook-level document. [`pipeline::update_index`] drives it
//! over a [`nbindex_source::Source`], pushing results to an index and
//! archiving the original bytes.

pub mod cell;
pub mod documents;
pub mod identity;
pub mod memes;
pub mod notebook;
pub mod pipeline;

pub use documents::{DocumentAssembler, assemble, notebook_attributes};
pub use identity::{filename_of, notebook_id};
pub use memes::{MemeChains, MemeIndex};
pub use pipeline::{
    FailedNotebook, ProgressReporter, SilentProgress, UpdateSummary, update_index,
};
