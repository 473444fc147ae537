//! Markdown structure tree and the parser capability that produces it.
//!
//! The extractor only needs a handful of node kinds; everything else
//! collapses into [`NodeKind::Other`] while keeping its children.

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag};

/// Kind of a node in the markdown tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a parsed document.
    Document,
    Heading { level: u8 },
    Link { target: String },
    /// A run of literal text. Always a leaf.
    Text(String),
    InlineCode,
    CodeFence,
    /// Single-delimiter emphasis.
    Emphasis,
    /// Double-delimiter emphasis.
    Strong,
    Other,
}

/// A markdown tree node with a uniform `children` relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(content.into()))
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, NodeKind::Heading { .. })
    }

    /// Flattened text: text runs verbatim, containers join their children
    /// with a single space, other leaves contribute nothing.
    pub fn plain_text(&self) -> String {
        match &self.kind {
            NodeKind::Text(content) => content.clone(),
            _ => self
                .children
                .iter()
                .map(Node::plain_text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// The smallest heading level anywhere in this subtree.
    pub fn min_heading_level(&self) -> Option<u8> {
        let own = match self.kind {
            NodeKind::Heading { level } => Some(level),
            _ => None,
        };
        self.children
            .iter()
            .filter_map(Node::min_heading_level)
            .chain(own)
            .min()
    }
}

/// Turns markdown text into a [`Node`] tree.
///
/// Implementations must be total: input they cannot interpret is kept as
/// plain text rather than rejected.
pub trait MarkdownParser: Send + Sync {
    fn parse(&self, markdown: &str) -> Node;
}

/// CommonMark parser backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkParser;

impl MarkdownParser for CommonMarkParser {
    fn parse(&self, markdown: &str) -> Node {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut stack = vec![Node::new(NodeKind::Document)];

        for event in Parser::new_ext(markdown, options) {
            match event {
                Event::Start(tag) => stack.push(Node::new(kind_of(&tag))),
                Event::End(_) => close_top(&mut stack),
                Event::Text(content) => push_text(&mut stack, &content),
                Event::Code(content) => push_child(
                    &mut stack,
                    Node::with_children(NodeKind::InlineCode, vec![Node::text(content.as_ref())]),
                ),
                // html, breaks, rules, footnote refs, task markers
                _ => push_child(&mut stack, Node::new(NodeKind::Other)),
            }
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        stack
            .pop()
            .unwrap_or_else(|| Node::new(NodeKind::Document))
    }
}

fn kind_of(tag: &Tag<'_>) -> NodeKind {
    match tag {
        Tag::Heading { level, .. } => NodeKind::Heading {
            level: (*level as u8).min(6),
        },
        Tag::Link {
            link_type: LinkType::Autolink | LinkType::Email,
            ..
        } => NodeKind::Other,
        Tag::Link { dest_url, .. } => NodeKind::Link {
            target: dest_url.to_string(),
        },
        Tag::CodeBlock(CodeBlockKind::Fenced(_)) => NodeKind::CodeFence,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        _ => NodeKind::Other,
    }
}

/// Pop the innermost open node and attach it to its parent.
fn close_top(stack: &mut Vec<Node>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(node) = stack.pop() {
        push_child(stack, node);
    }
}

fn push_child(stack: &mut [Node], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Append text, coalescing with an immediately preceding text run.
fn push_text(stack: &mut [Node], content: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(Node {
        kind: NodeKind::Text(existing),
        ..
    }) = parent.children.last_mut()
    {
        existing.push_str(content);
        return;
    }
    parent.children.push(Node::text(content));
}
