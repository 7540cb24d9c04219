//! Symbol index built during collection.
//!
//! Append-only while files are being visited, read-only once detectors run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sonar_lsp::{DocumentSymbolNode, Location, Position, Range, SymbolKind};

use crate::files::display_path;

/// One flattened outline symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    /// Parent's qualified name + "." + name.
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file: PathBuf,
    pub uri: String,
    /// Full declaration span.
    pub range: Range,
    /// Span of the name; its start is the point used for queries.
    pub selection_range: Range,
    /// Server-provided detail (often a signature).
    pub detail: Option<String>,
    /// Qualified name of the enclosing symbol.
    pub parent: Option<String>,
    /// Raw `references(includeDeclaration=false)` result, when requested.
    pub references: Option<Vec<Location>>,
    /// Hover text, when requested.
    pub hover: Option<String>,
}

impl SymbolEntry {
    #[must_use]
    pub fn selection_point(&self) -> Position {
        self.selection_range.start
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// References with this symbol's own declaration site filtered out.
    ///
    /// `None` when references were never requested for this entry.
    #[must_use]
    pub fn external_references(&self) -> Option<Vec<&Location>> {
        let references = self.references.as_ref()?;
        Some(
            references
                .iter()
                .filter(|loc| !self.is_declaration_site(loc))
                .collect(),
        )
    }

    fn is_declaration_site(&self, location: &Location) -> bool {
        location.uri == self.uri && self.selection_range.contains(location.range.start)
    }
}

/// Flatten an outline into entries, depth first, parents before children.
#[must_use]
pub fn flatten(nodes: &[DocumentSymbolNode], file: &Path, uri: &str) -> Vec<SymbolEntry> {
    let mut out = Vec::new();
    for node in nodes {
        // Flat SymbolInformation answers carry the container by name only.
        push_node(node, node.container.as_deref(), file, uri, &mut out);
    }
    out
}

fn push_node(
    node: &DocumentSymbolNode,
    parent: Option<&str>,
    file: &Path,
    uri: &str,
    out: &mut Vec<SymbolEntry>,
) {
    let qualified_name = match parent {
        Some(parent) => format!("{parent}.{}", node.name),
        None => node.name.clone(),
    };
    out.push(SymbolEntry {
        name: node.name.clone(),
        qualified_name: qualified_name.clone(),
        kind: node.kind,
        file: file.to_path_buf(),
        uri: uri.to_string(),
        range: node.range,
        selection_range: node.selection_range,
        detail: node.detail.clone(),
        parent: parent.map(String::from),
        references: None,
        hover: None,
    });
    for child in &node.children {
        push_node(child, Some(&qualified_name), file, uri, out);
    }
}

/// One analyzed source file.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub uri: String,
    pub text: String,
    pub symbol_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    root: PathBuf,
    files: Vec<IndexedFile>,
    entries: Vec<SymbolEntry>,
}

impl SymbolIndex {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn push_file(&mut self, path: PathBuf, uri: String, text: String, entries: Vec<SymbolEntry>) {
        self.files.push(IndexedFile {
            path,
            uri,
            text,
            symbol_count: entries.len(),
        });
        self.entries.extend(entries);
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    #[must_use]
    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }

    #[must_use]
    pub fn file_text(&self, path: &Path) -> Option<&str> {
        self.files
            .iter()
            .find(|file| file.path == path)
            .map(|file| file.text.as_str())
    }

    /// Path relative to the workspace root, for reports.
    #[must_use]
    pub fn display(&self, path: &Path) -> String {
        display_path(&self.root, path)
    }

    /// Display form of a location's file, falling back to the raw URI.
    #[must_use]
    pub fn display_uri(&self, uri: &str) -> String {
        sonar_lsp::file_uri_to_path(uri).map_or_else(|| uri.to_string(), |path| self.display(&path))
    }

    #[must_use]
    pub fn symbol_ref(&self, entry: &SymbolEntry) -> SymbolRef {
        SymbolRef {
            name: entry.name.clone(),
            qualified_name: entry.qualified_name.clone(),
            kind: entry.kind,
            file: self.display(&entry.file),
            line: entry.selection_point().line + 1,
        }
    }
}

/// Report-facing reference to an indexed symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRef {
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file: String,
    /// 1-based.
    pub line: u32,
}
