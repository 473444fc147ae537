//! Document set assembly: the single entry point turning one notebook into
//! its cell and notebook collections.

use tracing::{debug, instrument};

use nbindex_markdown::FieldExtractor;
use nbindex_shared::{Attributes, DocumentSet, IndexKind, Notebook};

use crate::cell::{CellContext, cell_document};
use crate::identity::notebook_id;
use crate::memes::MemeIndex;
use crate::notebook::notebook_document;

/// Notebook attributes: the non-empty `base` entries plus meme and server
/// signature fields read from the notebook metadata.
pub fn notebook_attributes(notebook: &Notebook, base: Option<&Attributes>) -> Attributes {
    let mut attributes: Attributes = base
        .into_iter()
        .flatten()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let mut copy = |name: &str, value: Option<&String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            attributes.insert(name.to_string(), value.clone());
        }
    };

    if let Some(meme) = notebook.meme() {
        copy("lc_notebook_meme__current", meme.current.as_ref());
    }
    if let Some(signature) = notebook.signature() {
        copy("signature_notebook_path", signature.notebook_path.as_ref());
        copy("signature_server_url", signature.server_url.as_ref());
        copy("signature_id", signature.signature_id.as_ref());
    }

    attributes
}

/// Builds document sets with a configurable markdown extractor.
#[derive(Default)]
pub struct DocumentAssembler {
    extractor: FieldExtractor,
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extractor(extractor: FieldExtractor) -> Self {
        Self { extractor }
    }

    /// Produce the `jupyter-cell` and `jupyter-notebook` collections.
    ///
    /// A notebook without cells yields only the notebook collection.
    #[instrument(skip_all, fields(path = %path, cells = notebook.cells.len()))]
    pub fn assemble(
        &self,
        path: &str,
        notebook: &Notebook,
        attributes: Option<&Attributes>,
    ) -> DocumentSet {
        let attributes = notebook_attributes(notebook, attributes);
        let mut set = DocumentSet::new();

        let notebook_doc = notebook_document(&self.extractor, path, notebook, Some(&attributes));
        set.insert(IndexKind::Notebook, vec![notebook_doc]);

        if notebook.cells.is_empty() {
            debug!("notebook has no cells");
            return set;
        }

        let id = notebook_id(path, notebook);
        let ctx = CellContext {
            notebook_id: &id,
            path,
            attributes: Some(&attributes),
        };
        let memes = MemeIndex::build(&notebook.cells, &self.extractor);

        let cell_docs = notebook
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let chains = memes.chains(i);
                cell_document(&self.extractor, ctx, cell, i, Some(&chains))
            })
            .collect::<Vec<_>>();
        debug!(notebook_id = %id, count = cell_docs.len(), "cell documents built");
        set.insert(IndexKind::Cell, cell_docs);

        set
    }
}

/// Assemble with the default CommonMark extractor.
pub fn assemble(path: &str, notebook: &Notebook, attributes: Option<&Attributes>) -> DocumentSet {
    DocumentAssembler::default().assemble(path, notebook, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbindex_shared::FieldValue;
    use serde_json::json;

    fn notebook(value: serde_json::Value) -> Notebook {
        serde_json::from_value(value).expect("notebook fixture")
    }

    fn meme_cell(cell_type: &str, source: &str, meme: &str) -> serde_json::Value {
        json!({
            "cell_type": cell_type,
            "source": [source],
            "metadata": {"lc_cell_meme": {"current": meme}}
        })
    }

    #[test]
    fn zero_cells_yields_notebook_collection_only() {
        let set = assemble("a/empty.ipynb", &notebook(json!({"cells": []})), None);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(IndexKind::Cell));
        let docs = set.get(IndexKind::Notebook).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_text("id"), Some("unknown_undefined_empty.ipynb"));

        let missing = assemble("a/empty.ipynb", &notebook(json!({})), None);
        assert_eq!(missing, set);
    }

    #[test]
    fn attributes_merge_signature_fields() {
        let nb = notebook(json!({"metadata": {"lc_notebook_meme": {
            "current": "nb-1",
            "lc_server_signature": {"current": {
                "signature_id": "sig",
                "notebook_path": "/notebooks/x.ipynb",
                "server_url": ""
            }}
        }}}));
        let base: Attributes = [
            ("server".to_string(), "http://jupyter/".to_string()),
            ("owner".to_string(), String::new()),
        ]
        .into();

        let attributes = notebook_attributes(&nb, Some(&base));
        assert_eq!(attributes.get("server").map(String::as_str), Some("http://jupyter/"));
        assert!(!attributes.contains_key("owner"));
        assert_eq!(attributes["lc_notebook_meme__current"], "nb-1");
        assert_eq!(attributes["signature_id"], "sig");
        assert_eq!(attributes["signature_notebook_path"], "/notebooks/x.ipynb");
        assert!(!attributes.contains_key("signature_server_url"));
    }

    #[test]
    fn cell_and_notebook_collections() {
        let nb = notebook(json!({
            "cells": [
                meme_cell("markdown", "# A", "1"),
                meme_cell("code", "b", "2"),
                meme_cell("markdown", "# C", "3"),
                meme_cell("code", "d", "4")
            ],
            "metadata": {"lc_notebook_meme": {
                "current": "nb",
                "lc_server_signature": {"current": {"signature_id": "sig"}}
            }}
        }));
        let base: Attributes = [("mtime".to_string(), "2024-01-01T00:00:00Z".to_string())].into();
        let set = assemble("/home/u/t.ipynb", &nb, Some(&base));

        let kinds: Vec<_> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![IndexKind::Cell, IndexKind::Notebook]);

        let cells = set.get(IndexKind::Cell).unwrap();
        assert_eq!(cells.len(), 4);
        for (i, doc) in cells.iter().enumerate() {
            assert_eq!(doc.get_text("id"), Some(format!("sig_nb_t.ipynb_{i}").as_str()));
            assert_eq!(doc.get("index"), Some(&FieldValue::Integer(i as i64)));
            assert_eq!(doc.get_text("notebook_mtime"), Some("2024-01-01T00:00:00Z"));
        }

        let b = &cells[1];
        assert_eq!(b.get_text("lc_cell_memes__previous__in_section"), Some("1"));
        assert_eq!(b.get_text("lc_cell_memes__next__in_section"), Some(""));
        assert_eq!(b.get_text("lc_cell_memes__previous__in_notebook"), Some("1"));
        assert_eq!(b.get_text("lc_cell_memes__next__in_notebook"), Some("3 4"));

        let nb_doc = &set.get(IndexKind::Notebook).unwrap()[0];
        assert_eq!(nb_doc.get_text("id"), Some("sig_nb_t.ipynb"));
        assert_eq!(nb_doc.get_text("filename"), Some("t.ipynb"));
        assert_eq!(nb_doc.get_text("mtime"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(nb_doc.get_text("signature_id"), Some("sig"));
        assert_eq!(nb_doc.get_text("lc_cell_memes"), Some("1 2 3 4"));
        assert!(!nb_doc.contains("lc_cell_memes__next__in_notebook"));
    }

    #[test]
    fn single_section_previous_chains() {
        let nb = notebook(json!({"cells": [
            meme_cell("markdown", "# Section - 1", "M1"),
            meme_cell("code", "x = 1", "M2"),
            meme_cell("markdown", "Content (1-1)", "M3"),
            meme_cell("code", "y = 2", "M4")
        ]}));
        let set = assemble("t.ipynb", &nb, None);
        let cells = set.get(IndexKind::Cell).unwrap();

        let expected = ["M1", "M1 M2", "M1 M2 M3"];
        for (doc, previous) in cells[1..].iter().zip(expected) {
            let section = doc.get_text("lc_cell_memes__previous__in_section");
            assert_eq!(section, Some(previous));
            assert_eq!(doc.get_text("lc_cell_memes__previous__in_notebook"), section);
        }
    }

    #[test]
    fn documents_serialize_deterministically() {
        let nb = notebook(json!({"cells": [meme_cell("markdown", "# About\n*TBD*", "x")]}));
        let first = serde_json::to_string(&assemble("t.ipynb", &nb, None)).unwrap();
        let second = serde_json::to_string(&assemble("t.ipynb", &nb, None)).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(r#"{"jupyter-cell":["#));
    }
}
