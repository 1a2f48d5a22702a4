//! Parsed TypeScript file and tree helpers.

use crate::error::{SourceError, SourceResult};
use camino::{Utf8Path, Utf8PathBuf};
use ngmigrate_edit::apply_spans;
use ngmigrate_types::{ReplacementSpan, Span};
use tree_sitter::{Language, Node, Parser, Tree};
use tracing::debug;

/// A TypeScript file with its syntax tree.
///
/// Transforms never mutate in place: they compute spans against this text
/// and return a freshly parsed file, so every tree matches its text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: Utf8PathBuf,
    text: String,
    tree: Tree,
}

impl SourceFile {
    pub fn parse(path: impl Into<Utf8PathBuf>, text: impl Into<String>) -> SourceResult<Self> {
        let path = path.into();
        let text = text.into();

        let language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        let mut parser = Parser::new();
        parser.set_language(&language)?;

        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| SourceError::Parse { path: path.clone() })?;
        if tree.root_node().has_error() {
            return Err(SourceError::Parse { path });
        }

        Ok(Self { path, text, tree })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub(crate) fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub(crate) fn node_text(&self, node: Node<'_>) -> &str {
        self.text
            .get(node.start_byte()..node.end_byte())
            .unwrap_or_default()
    }

    /// Apply `spans` and reparse. With no spans the file is returned as is.
    pub(crate) fn edited(&self, spans: Vec<ReplacementSpan>) -> SourceResult<SourceFile> {
        if spans.is_empty() {
            return Ok(self.clone());
        }
        let outcome = apply_spans(&self.text, spans).map_err(|source| SourceError::Edit {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path, applied = outcome.applied, "source edited");
        SourceFile::parse(self.path.clone(), outcome.text)
    }

    /// Every class declaration in the file, outermost first.
    pub(crate) fn class_declarations(&self) -> Vec<Node<'_>> {
        let mut out = Vec::new();
        collect_kind(self.root(), &["class_declaration", "abstract_class_declaration"], &mut out);
        out
    }

    pub(crate) fn class_name(&self, class: Node<'_>) -> String {
        class
            .child_by_field_name("name")
            .map(|n| self.node_text(n).to_string())
            .unwrap_or_default()
    }
}

pub(crate) fn span_of(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children without comments.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

fn collect_kind<'t>(node: Node<'t>, kinds: &[&str], out: &mut Vec<Node<'t>>) {
    if kinds.contains(&node.kind()) {
        out.push(node);
    }
    for child in named_children(node) {
        collect_kind(child, kinds, out);
    }
}
