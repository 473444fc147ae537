//! Notebook-level search document: per-cell source and output fields
//! folded into one record.

use nbindex_markdown::FieldExtractor;
use nbindex_shared::{Attributes, Document, Notebook, field_root};

use crate::cell::{CellContext, cell_document};
use crate::identity::{filename_of, notebook_id};

const EXECUTION_END_TIME: &str = "lc_cell_meme__execution_end_time";

/// Field roots accumulated across cells.
const FOLDED_ROOTS: [&str; 2] = ["source", "outputs"];

/// Build the notebook document for `notebook` stored at `path`.
pub fn notebook_document(
    extractor: &FieldExtractor,
    path: &str,
    notebook: &Notebook,
    attributes: Option<&Attributes>,
) -> Document {
    let id = notebook_id(path, notebook);
    let filename = filename_of(path);

    let mut doc = Document::new();
    doc.set("id", id.as_str());
    doc.set("filename", filename);
    if let Some(attributes) = attributes {
        for (name, value) in attributes {
            doc.set(name.as_str(), value.as_str());
        }
    }

    if notebook.cells.is_empty() {
        return doc;
    }

    doc.set("source", "");
    doc.set("outputs", "");

    let ctx = CellContext {
        notebook_id: &id,
        path,
        attributes: None,
    };
    let mut memes = Vec::new();
    let mut end_times = Vec::new();

    for (i, cell) in notebook.cells.iter().enumerate() {
        if let Some(meme) = cell.meme_id() {
            memes.push(meme);
        }
        for (name, value) in cell_document(extractor, ctx, cell, i, None) {
            if name == EXECUTION_END_TIME {
                end_times.push(value.to_string());
                continue;
            }
            if FOLDED_ROOTS.contains(&field_root(&name)) {
                doc.append(name, &value.to_string());
            }
        }
    }

    doc.set("lc_cell_memes", memes.join(" "));
    if let Some(latest) = end_times.into_iter().max() {
        doc.set(EXECUTION_END_TIME, latest);
    }

    let text = format!(
        "{filename}\n{}\n{}",
        doc.get_text("source").unwrap_or_default(),
        doc.get_text("outputs").unwrap_or_default()
    );
    doc.set("_text_", text);

    let heading_count = doc
        .get_text("source__markdown__heading")
        .map(|headings| headings.split('\n').count().to_string())
        .unwrap_or_else(|| "0".to_string());
    doc.set("source__markdown__heading_count", heading_count);

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: serde_json::Value, attributes: Option<&Attributes>) -> Document {
        let notebook: Notebook = serde_json::from_value(value).expect("notebook fixture");
        notebook_document(&FieldExtractor::default(), "work/test.ipynb", &notebook, attributes)
    }

    #[test]
    fn zero_cells_gives_minimal_document() {
        let attributes: Attributes = [("owner".to_string(), "alice".to_string())].into();
        let doc = build(json!({"cells": []}), Some(&attributes));
        assert_eq!(doc.get_text("id"), Some("unknown_undefined_test.ipynb"));
        assert_eq!(doc.get_text("filename"), Some("test.ipynb"));
        assert_eq!(doc.get_text("owner"), Some("alice"));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn folds_source_and_outputs_across_cells() {
        let doc = build(
            json!({"cells": [
                {"cell_type": "markdown", "source": ["# Title"]},
                {"cell_type": "code", "source": "print(1)",
                 "outputs": [{"output_type": "stream", "name": "stdout", "text": "1\n"}]},
                {"cell_type": "markdown", "source": "## Part\n\n*todo*"}
            ]}),
            None,
        );
        assert_eq!(doc.get_text("source"), Some("# Title\nprint(1)\n## Part\n\n*todo*"));
        assert_eq!(doc.get_text("source__code"), Some("print(1)"));
        assert_eq!(doc.get_text("source__markdown"), Some("# Title\n## Part\n\n*todo*"));
        assert_eq!(doc.get_text("source__markdown__heading"), Some("# Title\n## Part"));
        assert_eq!(doc.get_text("source__markdown__heading_count"), Some("2"));
        assert_eq!(doc.get_text("source__markdown__todo"), Some("## Part\n\n*todo*"));
        assert_eq!(doc.get_text("outputs__stdout"), Some("1\n"));
        assert_eq!(doc.get_text("outputs"), Some("1\n"));
        assert_eq!(
            doc.get_text("_text_"),
            Some("test.ipynb\n# Title\nprint(1)\n## Part\n\n*todo*\n1\n")
        );
        assert!(!doc.contains("index"));
        assert!(!doc.contains("notebook_id"));
    }

    #[test]
    fn collects_memes_and_latest_execution_time() {
        let doc = build(
            json!({"cells": [
                {"cell_type": "code", "source": "a", "metadata": {"lc_cell_meme": {
                    "current": "m1", "execution_end_time": "2024-03-01T10:00:00Z"}}},
                {"cell_type": "code", "source": "b"},
                {"cell_type": "code", "source": "c", "metadata": {"lc_cell_meme": {
                    "current": "m3", "execution_end_time": "2024-05-01T10:00:00Z"}}},
                {"cell_type": "code", "source": "d", "metadata": {"lc_cell_meme": {
                    "current": "m4", "execution_end_time": "2024-04-01T10:00:00Z"}}}
            ]}),
            None,
        );
        assert_eq!(doc.get_text("lc_cell_memes"), Some("m1 m3 m4"));
        assert_eq!(
            doc.get_text("lc_cell_meme__execution_end_time"),
            Some("2024-05-01T10:00:00Z")
        );
        assert!(!doc.contains("lc_cell_meme__current"));
    }

    #[test]
    fn no_headings_counts_zero() {
        let doc = build(json!({"cells": [{"cell_type": "code", "source": "x"}]}), None);
        assert_eq!(doc.get_text("source__markdown__heading_count"), Some("0"));
        assert_eq!(doc.get_text("outputs"), Some(""));
        assert_eq!(doc.get_text("lc_cell_memes"), Some(""));
        assert_eq!(doc.get_text("_text_"), Some("test.ipynb\nx\n"));
    }
}
