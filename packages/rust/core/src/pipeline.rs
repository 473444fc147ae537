//! End-to-end `update` pipeline: source → assemble → index → archive.

use std::time::Instant;

use tracing::{info, instrument, warn};

use nbindex_shared::{IndexKind, NbIndexError, Notebook, Result};
use nbindex_solr::IndexClient;
use nbindex_source::{Source, SourceFile};
use nbindex_storage::NotebookArchive;

use crate::documents::DocumentAssembler;
use crate::identity::filename_of;

/// A notebook that could not be indexed.
#[derive(Debug)]
pub struct FailedNotebook {
    pub path: String,
    pub error: NbIndexError,
}

/// Result of one `update_index` run.
#[derive(Debug, Default)]
pub struct UpdateSummary {
    /// Notebooks whose collections were all indexed and archived.
    pub notebooks_indexed: usize,
    /// Document collections posted, including those of failed notebooks.
    pub collections_posted: usize,
    pub failures: Vec<FailedNotebook>,
    pub elapsed: std::time::Duration,
}

impl UpdateSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Comma-separated paths of failed notebooks.
    pub fn failed_paths(&self) -> String {
        self.failures
            .iter()
            .map(|f| f.path.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a notebook is indexed and archived.
    fn notebook_indexed(&self, path: &str, current: usize, total: usize);
    /// Called when a notebook fails.
    fn notebook_failed(&self, path: &str, error: &NbIndexError);
    /// Called when the pipeline completes.
    fn done(&self, summary: &UpdateSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn notebook_indexed(&self, _path: &str, _current: usize, _total: usize) {}
    fn notebook_failed(&self, _path: &str, _error: &NbIndexError) {}
    fn done(&self, _summary: &UpdateSummary) {}
}

/// Index every notebook of `source`, or only those whose filename equals
/// the filename of `filter`.
///
/// Per-notebook failures are collected in the summary instead of aborting
/// the run; only a failure to list the source is returned as an error.
#[instrument(skip_all, fields(filter = ?filter))]
pub async fn update_index<S, I, A>(
    source: &S,
    index: &I,
    archive: &A,
    filter: Option<&str>,
    progress: &dyn ProgressReporter,
) -> Result<UpdateSummary>
where
    S: Source + ?Sized,
    I: IndexClient,
    A: NotebookArchive,
{
    let start = Instant::now();
    let assembler = DocumentAssembler::new();

    progress.phase("Listing notebooks");
    let wanted = filter.map(filename_of);
    let files: Vec<SourceFile> = source
        .list_files()?
        .into_iter()
        .filter(|f| wanted.is_none_or(|name| filename_of(&f.path) == name))
        .collect();
    info!(count = files.len(), "updating indices");

    progress.phase("Indexing notebooks");
    let mut summary = UpdateSummary::default();
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        match index_notebook(&assembler, source, index, archive, file, &mut summary).await {
            Ok(()) => {
                summary.notebooks_indexed += 1;
                progress.notebook_indexed(&file.path, i + 1, total);
            }
            Err(error) => {
                warn!(path = %file.path, %error, "failed to update index");
                progress.notebook_failed(&file.path, &error);
                summary.failures.push(FailedNotebook {
                    path: file.path.clone(),
                    error,
                });
            }
        }
    }

    summary.elapsed = start.elapsed();
    info!(
        elapsed_ms = summary.elapsed.as_millis(),
        "finished: {} updates, {} fails",
        summary.notebooks_indexed,
        summary.failures.len()
    );
    progress.done(&summary);

    Ok(summary)
}

/// Read, assemble, index, and archive one notebook.
async fn index_notebook<S, I, A>(
    assembler: &DocumentAssembler,
    source: &S,
    index: &I,
    archive: &A,
    file: &SourceFile,
    summary: &mut UpdateSummary,
) -> Result<()>
where
    S: Source + ?Sized,
    I: IndexClient,
    A: NotebookArchive,
{
    let bytes = source.read_notebook(&file.server, &file.path)?;
    let notebook = Notebook::from_slice(&bytes)
        .map_err(|e| NbIndexError::notebook(&file.path, e.to_string()))?;

    let attributes = file.attributes();
    let documents = assembler.assemble(&file.path, &notebook, Some(&attributes));

    for (kind, docs) in documents.iter() {
        info!(path = %file.path, core = %kind, count = docs.len(), "posting documents");
        index.index_documents(kind, docs).await?;
        summary.collections_posted += 1;

        if kind != IndexKind::Notebook {
            continue;
        }
        let Some(id) = docs.first().and_then(|d| d.get_text("id")) else {
            return Err(NbIndexError::notebook(&file.path, "notebook document has no id"));
        };
        archive.put(id, &bytes).await?;
    }

    Ok(())
}
