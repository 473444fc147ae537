//! Notebook data model (`.ipynb` JSON), lenient about missing and null keys.
//!
//! Only the parts the indexer reads are modelled; unknown keys are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{NbIndexError, Result};

/// Deserialize `null` as `T::default()`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Notebook
// ---------------------------------------------------------------------------

/// A parsed notebook: ordered cells plus optional metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default, deserialize_with = "nullable")]
    pub cells: Vec<Cell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NotebookMetadata>,
}

impl Notebook {
    /// Parse notebook JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| NbIndexError::parse(format!("invalid notebook JSON: {e}")))
    }

    /// Parse notebook JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_slice(text.as_bytes())
    }

    /// The notebook-level meme descriptor, if any.
    pub fn meme(&self) -> Option<&NotebookMeme> {
        self.metadata.as_ref()?.lc_notebook_meme.as_ref()
    }

    /// The current server signature record, if any.
    pub fn signature(&self) -> Option<&SignatureRecord> {
        self.meme()?.lc_server_signature.as_ref()?.current.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lc_notebook_meme: Option<NotebookMeme>,
}

/// Notebook-level revision descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookMeme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lc_server_signature: Option<ServerSignature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<SignatureRecord>,
}

/// Identifies the server a notebook was last saved on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// Kind of a notebook cell. Unknown kinds keep their original name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CellType {
    Code,
    Markdown,
    Other(String),
}

impl CellType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for CellType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "code" => Self::Code,
            "markdown" => Self::Markdown,
            _ => Self::Other(s),
        }
    }
}

impl From<CellType> for String {
    fn from(t: CellType) -> Self {
        t.as_str().to_string()
    }
}

/// Text stored either as one string or as a list of line fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Multiline {
    Single(String),
    Lines(Vec<String>),
}

impl Multiline {
    /// Concatenate the fragments without separators.
    pub fn joined(&self) -> String {
        match self {
            Self::Single(s) => s.clone(),
            Self::Lines(lines) => lines.concat(),
        }
    }
}

/// One notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_type: Option<CellType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Multiline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CellMetadata>,
}

impl Cell {
    /// A cell of the given type with the given source and nothing else.
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            cell_type: Some(cell_type),
            source: Some(Multiline::Single(source.into())),
            execution_count: None,
            outputs: None,
            metadata: None,
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.cell_type == Some(CellType::Markdown)
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == Some(CellType::Code)
    }

    /// Concatenated source text, if the cell has a source.
    pub fn source_text(&self) -> Option<String> {
        self.source.as_ref().map(Multiline::joined)
    }

    /// The per-cell meme descriptor, if any.
    pub fn meme(&self) -> Option<&CellMeme> {
        self.metadata.as_ref()?.lc_cell_meme.as_ref()
    }

    /// The cell's `current` meme id; cells without one take no part in chains.
    pub fn meme_id(&self) -> Option<&str> {
        self.meme()?.current.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lc_cell_meme: Option<CellMeme>,
}

/// Per-cell revision descriptor.
///
/// `previous`/`next` are adjacency hints only; chains are recomputed from
/// the full cell list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMeme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_end_time: Option<String>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One execution output record of a code cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Multiline>,
}

impl Output {
    pub fn is_execute_result(&self) -> bool {
        self.output_type.as_deref() == Some("execute_result")
    }

    /// Text payload for a mime type; string and list-of-strings encodings
    /// are accepted, anything else is treated as absent.
    pub fn data_text(&self, mime: &str) -> Option<String> {
        match self.data.get(mime)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(parts) => Some(
                parts
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .collect::<String>(),
            ),
            _ => None,
        }
    }

    /// Concatenated stream text.
    pub fn text(&self) -> String {
        self.text.as_ref().map(Multiline::joined).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_and_string_sources() {
        let nb = Notebook::from_json(
            r##"{"cells": [
                {"cell_type": "markdown", "source": ["# Title\n", "body"]},
                {"cell_type": "code", "source": "print(1)", "execution_count": null}
            ]}"##,
        )
        .expect("parse");
        assert_eq!(nb.cells.len(), 2);
        assert_eq!(nb.cells[0].source_text().as_deref(), Some("# Title\nbody"));
        assert_eq!(nb.cells[1].source_text().as_deref(), Some("print(1)"));
        assert_eq!(nb.cells[1].execution_count, None);
    }

    #[test]
    fn missing_and_null_keys_default() {
        let nb = Notebook::from_json(r#"{"cells": null}"#).expect("parse");
        assert!(nb.cells.is_empty());
        assert!(nb.meme().is_none());

        let nb = Notebook::from_json("{}").expect("parse");
        assert!(nb.cells.is_empty());
    }

    #[test]
    fn unknown_cell_type_keeps_name() {
        let nb = Notebook::from_json(r#"{"cells": [{"cell_type": "raw", "source": "x"}]}"#)
            .expect("parse");
        assert_eq!(nb.cells[0].cell_type, Some(CellType::Other("raw".into())));
        assert_eq!(nb.cells[0].cell_type.as_ref().unwrap().as_str(), "raw");
    }

    #[test]
    fn reads_meme_and_signature() {
        let nb = Notebook::from_json(
            r#"{"cells": [{"cell_type": "code", "source": "",
                 "metadata": {"lc_cell_meme": {"current": "c-1", "next": null}}}],
                "metadata": {"lc_notebook_meme": {"current": "n-1",
                 "lc_server_signature": {"current": {"signature_id": "sig"}}}}}"#,
        )
        .expect("parse");
        assert_eq!(nb.cells[0].meme_id(), Some("c-1"));
        assert_eq!(nb.cells[0].meme().unwrap().next, None);
        assert_eq!(nb.meme().unwrap().current.as_deref(), Some("n-1"));
        assert_eq!(nb.signature().unwrap().signature_id.as_deref(), Some("sig"));
    }

    #[test]
    fn output_data_text_accepts_lists() {
        let out: Output = serde_json::from_value(serde_json::json!({
            "output_type": "execute_result",
            "data": {
                "text/plain": ["line1\n", "line2"],
                "application/json": {"a": 1}
            }
        }))
        .expect("parse");
        assert!(out.is_execute_result());
        assert_eq!(out.data_text("text/plain").as_deref(), Some("line1\nline2"));
        assert_eq!(out.data_text("application/json"), None);
        assert_eq!(out.data_text("text/html"), None);
    }

    #[test]
    fn rejects_non_json() {
        let err = Notebook::from_slice(b"not json").unwrap_err();
        assert!(err.to_string().contains("invalid notebook JSON"));
    }
}
