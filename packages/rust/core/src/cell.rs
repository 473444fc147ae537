//! Cell-level search documents.

use nbindex_markdown::FieldExtractor;
use nbindex_shared::{Attributes, Cell, CellType, Document, Output, field_root};

use crate::memes::MemeChains;

/// Notebook attributes copied onto every cell as `notebook_{name}`.
const INHERITED_ATTRIBUTES: [&str; 5] = ["server", "owner", "ctime", "atime", "mtime"];

const MARKDOWN_PREFIX: &str = "source__markdown__";

/// What a cell document needs to know about its notebook.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub notebook_id: &'a str,
    pub path: &'a str,
    pub attributes: Option<&'a Attributes>,
}

/// Build the search document for `cell` at position `index`.
///
/// `chains` is supplied only when the whole cell list is known; without it
/// no `lc_cell_memes__*` field is written.
pub fn cell_document(
    extractor: &FieldExtractor,
    ctx: CellContext<'_>,
    cell: &Cell,
    index: usize,
    chains: Option<&MemeChains>,
) -> Document {
    let mut doc = Document::new();
    doc.set("id", format!("{}_{index}", ctx.notebook_id));
    doc.set("index", index);
    doc.set("notebook_id", ctx.notebook_id);
    doc.set("notebook_filename", ctx.path);

    if let Some(attributes) = ctx.attributes {
        for (name, value) in attributes {
            if INHERITED_ATTRIBUTES.contains(&name.as_str()) {
                doc.set(format!("notebook_{name}"), value.as_str());
            }
        }
    }

    if let Some(cell_type) = &cell.cell_type {
        doc.set("cell_type", cell_type.as_str());
    }
    if let Some(count) = cell.execution_count {
        doc.set("execution_count", count);
    }

    if let Some(meme) = cell.meme() {
        let fields = [
            ("lc_cell_meme__current", &meme.current),
            ("lc_cell_meme__next", &meme.next),
            ("lc_cell_meme__previous", &meme.previous),
            ("lc_cell_meme__execution_end_time", &meme.execution_end_time),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                doc.set(name, value.as_str());
            }
        }
    }

    if let Some(source) = cell.source_text() {
        match cell.cell_type {
            Some(CellType::Code) => {
                doc.set("source__code", source.as_str());
                doc.set("source", source);
            }
            Some(CellType::Markdown) => {
                let fields = extractor.extract(&source, MARKDOWN_PREFIX);
                doc.set("source__markdown", source.as_str());
                doc.set("source", source);
                doc.merge(fields);
            }
            _ => {}
        }
    }

    let text = doc.get_text("source").unwrap_or_default().to_string();
    doc.set("_text_", text);

    if let Some(chains) = chains {
        chains.write_to(&mut doc);
    }

    let estimated = doc
        .get_text("lc_cell_meme__execution_end_time")
        .or_else(|| doc.get_text("notebook_mtime"))
        .map(str::to_string);
    if let Some(mtime) = estimated {
        doc.set("estimated_mtime", mtime);
    }

    if let Some(outputs) = &cell.outputs {
        write_outputs(&mut doc, outputs);
    }

    doc
}

/// Copy result and stream payloads, then build the combined `outputs` field.
fn write_outputs(doc: &mut Document, outputs: &[Output]) {
    for output in outputs {
        if output.is_execute_result() {
            if let Some(plain) = output.data_text("text/plain") {
                doc.set("outputs__result_plain", plain);
            }
            if let Some(html) = output.data_text("text/html") {
                doc.set("outputs__result_html", html);
            }
            continue;
        }
        match output.name.as_deref() {
            Some(name @ ("stdout" | "stderr")) => {
                doc.set(format!("outputs__{name}"), output.text());
            }
            _ => {}
        }
    }

    // keys iterate in ascending order
    let combined = doc
        .iter()
        .filter(|(key, _)| field_root(key) == "outputs")
        .map(|(_, value)| value.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let text = format!("{}\n{combined}", doc.get_text("_text_").unwrap_or_default());
    doc.set("outputs", combined);
    doc.set("_text_", text);
}
