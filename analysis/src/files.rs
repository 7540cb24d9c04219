//! Source file discovery.

use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use serde::Deserialize;

/// Directory names never descended into.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".venv",
    "venv",
    "node_modules",
    "__pycache__",
    ".git",
    "dist",
    "build",
    "site-packages",
    ".tox",
    "coverage",
    ".next",
    "out",
    "target",
];

pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "py"];

/// `[files]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileSelection {
    /// Extensions to analyze, without the leading dot.
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub max_files: Option<usize>,
}

impl Default for FileSelection {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(ToString::to_string).collect(),
            max_files: None,
        }
    }
}

impl FileSelection {
    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
    }
}

/// Walk `root` and return matching source files, sorted.
///
/// Respects `.gitignore`; hidden files are still visited unless excluded by
/// name.
#[must_use]
pub fn discover(root: &Path, selection: &FileSelection) -> Vec<PathBuf> {
    let excluded = selection.exclude_dirs.clone();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            let name = entry.file_name().to_string_lossy();
            !(is_dir && excluded.iter().any(|ex| ex == name.as_ref()))
        })
        .build();

    let mut files: Vec<PathBuf> = walker
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(DirEntry::into_path)
        .filter(|path| selection.wants(path))
        .collect();

    files.sort();
    if let Some(max) = selection.max_files
        && files.len() > max
    {
        tracing::warn!(found = files.len(), max, "Truncating file set");
        files.truncate(max);
    }
    files
}

/// `languageId` for `didOpen`, by extension.
#[must_use]
pub fn language_id_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    let id = match ext.to_ascii_lowercase().as_str() {
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" | "pyi" => "python",
        "rs" => "rust",
        "go" => "go",
        _ => return None,
    };
    Some(id)
}

/// Path relative to `root` with forward slashes, for display.
#[must_use]
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
