//! Markdown field extraction for search documents.
//!
//! Parses markdown into a [`Node`] tree (via a swappable [`MarkdownParser`])
//! and walks it, collecting headings, links, URLs, code, and emphasis into a
//! flat [`Document`] keyed by `{prefix}{field}`. Two derived fields are
//! computed afterwards: `operation_note` (the content under an
//! "Operation Note" heading) and the verbatim `about` / `todo` markers.

mod ast;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{instrument, trace};

use nbindex_shared::Document;

pub use ast::{CommonMarkParser, MarkdownParser, Node, NodeKind};

/// Embedded `http(s)://` URLs inside plain text runs.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)",
    )
    .expect("valid regex")
});

static OPERATION_NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)operation\s*note").expect("valid regex"));

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extracts searchable fields from markdown text.
pub struct FieldExtractor {
    parser: Box<dyn MarkdownParser>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::with_parser(CommonMarkParser)
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different markdown parser.
    pub fn with_parser(parser: impl MarkdownParser + 'static) -> Self {
        Self {
            parser: Box::new(parser),
        }
    }

    /// Build the field bag for `markdown`, every key prefixed with `prefix`.
    ///
    /// Repeated writes to a key are newline-joined. The result depends only
    /// on the input text, so calling this twice yields identical bags.
    #[instrument(level = "trace", skip_all, fields(len = markdown.len(), prefix = %prefix))]
    pub fn extract(&self, markdown: &str, prefix: &str) -> Document {
        let tree = self.parser.parse(markdown);

        let mut fields = Document::new();
        collect_fields(&tree, prefix, &mut fields);

        if let Some(note) = find_section(&tree, &OPERATION_NOTE_RE) {
            fields.set(format!("{prefix}operation_note"), note);
        }
        if field_contains(&fields, &format!("{prefix}heading"), &["about"]) {
            fields.set(format!("{prefix}about"), markdown);
        }
        if field_contains(&fields, &format!("{prefix}emphasis"), &["todo", "tbd"]) {
            fields.set(format!("{prefix}todo"), markdown);
        }

        trace!(fields = fields.len(), "markdown fields extracted");
        fields
    }

    /// The minimum heading level in `markdown`, or `None` without headings.
    pub fn heading_level(&self, markdown: &str) -> Option<u8> {
        self.parser.parse(markdown).min_heading_level()
    }
}

/// Extract fields with the default CommonMark parser.
pub fn extract_fields(markdown: &str, prefix: &str) -> Document {
    FieldExtractor::default().extract(markdown, prefix)
}

/// Minimum heading level with the default CommonMark parser.
pub fn heading_level(markdown: &str) -> Option<u8> {
    FieldExtractor::default().heading_level(markdown)
}

// ---------------------------------------------------------------------------
// Tree walk
// ---------------------------------------------------------------------------

/// Emit fields for `node`, then descend into every child.
fn collect_fields(node: &Node, prefix: &str, fields: &mut Document) {
    match &node.kind {
        NodeKind::Heading { level } => {
            let level = (*level).min(6);
            let text = node.plain_text();
            fields.append(
                format!("{prefix}heading"),
                &format!("{} {text}", "#".repeat(usize::from(level))),
            );
            fields.append(format!("{prefix}heading_{level}"), &text);
        }
        NodeKind::Link { target } => {
            let text = node.plain_text();
            fields.append(format!("{prefix}link"), &format!("{text} {target}"));
            fields.append(format!("{prefix}url"), target);
        }
        NodeKind::Text(content) => {
            for url in URL_RE.find_iter(content) {
                fields.append(format!("{prefix}url"), url.as_str());
            }
        }
        NodeKind::InlineCode => {
            let text = node.plain_text();
            fields.append(format!("{prefix}code_inline"), &text);
            fields.append(format!("{prefix}code"), &text);
        }
        NodeKind::CodeFence => {
            let text = node.plain_text();
            fields.append(format!("{prefix}code_fence"), &text);
            fields.append(format!("{prefix}code"), &text);
        }
        NodeKind::Emphasis => {
            let text = node.plain_text();
            fields.append(format!("{prefix}emphasis_1"), &text);
            fields.append(format!("{prefix}emphasis"), &text);
        }
        NodeKind::Strong => {
            let text = node.plain_text();
            fields.append(format!("{prefix}emphasis_2"), &text);
            fields.append(format!("{prefix}emphasis"), &text);
        }
        NodeKind::Document | NodeKind::Other => {}
    }

    for child in &node.children {
        collect_fields(child, prefix, fields);
    }
}

/// Content following the first heading matching `pattern`, up to the next
/// heading of any level, one line per sibling node.
///
/// Searches the direct children first; if none of them is a matching
/// heading, recurses into each child in order and returns the first hit.
fn find_section(node: &Node, pattern: &Regex) -> Option<String> {
    let mut collected: Option<Vec<String>> = None;

    for child in &node.children {
        if child.is_heading() {
            if let Some(lines) = collected.take() {
                return Some(lines.join("\n"));
            }
            if pattern.is_match(&child.plain_text()) {
                collected = Some(Vec::new());
            }
            continue;
        }
        if let Some(lines) = collected.as_mut() {
            lines.push(child.plain_text());
        }
    }

    if let Some(lines) = collected {
        return Some(lines.join("\n"));
    }

    node.children
        .iter()
        .find_map(|child| find_section(child, pattern))
}

/// Whether the field's lowercase text contains any of `keywords`.
fn field_contains(fields: &Document, key: &str, keywords: &[&str]) -> bool {
    let Some(value) = fields.get(key) else {
        return false;
    };
    let lowered = value.to_string().to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "source__markdown__";

    fn text<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
        doc.get_text(&format!("{PREFIX}{field}"))
    }

    #[test]
    fn plain_paragraph_produces_no_fields() {
        let doc = extract_fields("No headings", PREFIX);
        assert!(doc.is_empty());
    }

    #[test]
    fn heading_fields() {
        let doc = extract_fields("# Section - 1", PREFIX);
        assert_eq!(text(&doc, "heading"), Some("# Section - 1"));
        assert_eq!(text(&doc, "heading_1"), Some("Section - 1"));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn repeated_headings_are_newline_joined() {
        let doc = extract_fields("# One\n\n## Two\n\n## Three\n", PREFIX);
        assert_eq!(text(&doc, "heading"), Some("# One\n## Two\n## Three"));
        assert_eq!(text(&doc, "heading_1"), Some("One"));
        assert_eq!(text(&doc, "heading_2"), Some("Two\nThree"));
    }

    #[test]
    fn link_fields() {
        let doc = extract_fields("See [the docs](https://example.com/docs).", PREFIX);
        assert_eq!(text(&doc, "link"), Some("the docs https://example.com/docs"));
        assert_eq!(text(&doc, "url"), Some("https://example.com/docs"));
    }

    #[test]
    fn urls_in_plain_text() {
        let doc = extract_fields(
            "Data at https://example.com/data?id=3 and http://www.test.org/x.",
            PREFIX,
        );
        assert_eq!(
            text(&doc, "url"),
            Some("https://example.com/data?id=3\nhttp://www.test.org/x.")
        );
    }

    #[test]
    fn code_fields() {
        let doc = extract_fields("Run `make all` first.\n\n```sh\nmake test\n```\n", PREFIX);
        assert_eq!(text(&doc, "code_inline"), Some("make all"));
        assert_eq!(text(&doc, "code_fence"), Some("make test\n"));
        assert_eq!(text(&doc, "code"), Some("make all\nmake test\n"));
    }

    #[test]
    fn emphasis_fields() {
        let doc = extract_fields("An *idea* and a **rule**.", PREFIX);
        assert_eq!(text(&doc, "emphasis_1"), Some("idea"));
        assert_eq!(text(&doc, "emphasis_2"), Some("rule"));
        assert_eq!(text(&doc, "emphasis"), Some("idea\nrule"));
        assert!(text(&doc, "todo").is_none());
    }

    #[test]
    fn todo_marker_stores_whole_text() {
        let md = "Fix this later: **TODO**\n\nmore text";
        let doc = extract_fields(md, PREFIX);
        assert_eq!(text(&doc, "todo"), Some(md));

        let md = "status: *tbd*";
        let doc = extract_fields(md, PREFIX);
        assert_eq!(text(&doc, "todo"), Some(md));
    }

    #[test]
    fn about_heading_stores_whole_text() {
        let md = "# About this notebook\n\nIt collects metrics.";
        let doc = extract_fields(md, PREFIX);
        assert_eq!(text(&doc, "about"), Some(md));
    }

    #[test]
    fn operation_note_collects_until_next_heading() {
        let md = "# Operation Note\n\nStop the service.\n\nRestart it.\n\n## Details\n\nignored\n";
        let doc = extract_fields(md, PREFIX);
        assert_eq!(
            text(&doc, "operation_note"),
            Some("Stop the service.\nRestart it.")
        );
    }

    #[test]
    fn operation_note_runs_to_end_without_following_heading() {
        let md = "Intro\n\n## operationnote\n\nLast step.\n";
        let doc = extract_fields(md, PREFIX);
        assert_eq!(text(&doc, "operation_note"), Some("Last step."));
    }

    #[test]
    fn operation_note_found_in_nested_block() {
        let md = "Intro\n\n> # Operation  Note\n> check disk\n";
        let doc = extract_fields(md, PREFIX);
        assert_eq!(text(&doc, "operation_note"), Some("check disk"));
    }

    #[test]
    fn no_operation_note_without_matching_heading() {
        let doc = extract_fields("# Notes\n\nnothing operational\n", PREFIX);
        assert!(text(&doc, "operation_note").is_none());
    }

    #[test]
    fn extraction_is_idempotent() {
        let md = "# About\n\n*todo* see https://example.com and [x](http://x.io)\n\n```\ncode\n```\n";
        let first = extract_fields(md, PREFIX);
        let second = extract_fields(md, PREFIX);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn prefix_is_applied_to_every_key() {
        let doc = extract_fields("# T\n\n*e*", "p__");
        assert!(doc.keys().all(|k| k.starts_with("p__")));
    }

    #[test]
    fn heading_level_is_minimum() {
        assert_eq!(heading_level("## Subsection\nTestTest\n"), Some(2));
        assert_eq!(heading_level("### a\n\n# b\n"), Some(1));
        assert_eq!(heading_level("Content (1-1)"), None);
    }

    #[test]
    fn custom_parser_is_used() {
        struct FlatParser;
        impl MarkdownParser for FlatParser {
            fn parse(&self, markdown: &str) -> Node {
                Node::with_children(NodeKind::Document, vec![Node::text(markdown)])
            }
        }

        let extractor = FieldExtractor::with_parser(FlatParser);
        let doc = extractor.extract("# not a heading https://example.com", "");
        assert_eq!(doc.get_text("url"), Some("https://example.com"));
        assert!(doc.get_text("heading").is_none());
        assert_eq!(extractor.heading_level("# x"), None);
    }
}
