//! Per-cell meme chains, scoped to the notebook and to the enclosing section.
//!
//! A section starts at a cell whose minimum markdown heading level is 1 (or
//! at the first cell) and runs up to the next such cell. Cells without a
//! `current` meme id are skipped in every chain but still count as section
//! members.

use nbindex_markdown::FieldExtractor;
use nbindex_shared::{Cell, Document};

/// Field name prefix for the computed chains.
const CHAIN_PREFIX: &str = "lc_cell_memes";

/// Ordered, space-joined meme ids visible to one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemeChains {
    pub next_in_notebook: String,
    pub previous_in_notebook: String,
    pub next_in_section: String,
    pub previous_in_section: String,
}

impl MemeChains {
    /// Write the four chains into `doc` as `lc_cell_memes__{direction}__in_{scope}`.
    pub fn write_to(&self, doc: &mut Document) {
        doc.set(
            format!("{CHAIN_PREFIX}__next__in_notebook"),
            self.next_in_notebook.as_str(),
        );
        doc.set(
            format!("{CHAIN_PREFIX}__previous__in_notebook"),
            self.previous_in_notebook.as_str(),
        );
        doc.set(
            format!("{CHAIN_PREFIX}__next__in_section"),
            self.next_in_section.as_str(),
        );
        doc.set(
            format!("{CHAIN_PREFIX}__previous__in_section"),
            self.previous_in_section.as_str(),
        );
    }
}

/// Meme ids and section boundaries of one notebook, computed once.
#[derive(Debug, Clone, Default)]
pub struct MemeIndex {
    memes: Vec<Option<String>>,
    /// Ascending indices of cells whose minimum heading level is 1.
    boundaries: Vec<usize>,
}

impl MemeIndex {
    pub fn build(cells: &[Cell], extractor: &FieldExtractor) -> Self {
        let memes = cells
            .iter()
            .map(|cell| cell.meme_id().map(str::to_string))
            .collect();
        let boundaries = cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| is_section_start(cell, extractor))
            .map(|(i, _)| i)
            .collect();
        Self { memes, boundaries }
    }

    pub fn len(&self) -> usize {
        self.memes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memes.is_empty()
    }

    /// `[start, end)` of the section containing cell `index`.
    pub fn section_bounds(&self, index: usize) -> (usize, usize) {
        // boundaries[..split] are <= index
        let split = self.boundaries.partition_point(|&b| b <= index);
        let start = split
            .checked_sub(1)
            .map(|k| self.boundaries[k])
            .unwrap_or(0);
        let end = self.boundaries.get(split).copied().unwrap_or(self.len());
        (start, end)
    }

    /// Chains for the cell at `index`. Out-of-range indices yield empty chains.
    pub fn chains(&self, index: usize) -> MemeChains {
        if index >= self.len() {
            return MemeChains::default();
        }
        let (start, end) = self.section_bounds(index);
        MemeChains {
            next_in_notebook: self.joined(index + 1, self.len()),
            previous_in_notebook: self.joined(0, index),
            next_in_section: self.joined(index + 1, end),
            previous_in_section: self.joined(start, index),
        }
    }

    fn joined(&self, from: usize, to: usize) -> String {
        if from >= to {
            return String::new();
        }
        self.memes[from..to]
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_section_start(cell: &Cell, extractor: &FieldExtractor) -> bool {
    if !cell.is_markdown() {
        return false;
    }
    cell.source_text()
        .and_then(|text| extractor.heading_level(&text))
        == Some(1)
}
