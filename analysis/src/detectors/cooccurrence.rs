use std::collections::{BTreeMap, BTreeSet};

use super::{CooccurrencePair, is_unit_kind};
use crate::index::SymbolIndex;

/// Pairs of top-level names that appear together in at least
/// `min_shared_files` files.
#[must_use]
pub fn detect(index: &SymbolIndex, min_shared_files: usize) -> Vec<CooccurrencePair> {
    let mut names_per_file: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for entry in index.entries() {
        if entry.is_top_level() && is_unit_kind(entry.kind) {
            names_per_file
                .entry(index.display(&entry.file))
                .or_default()
                .insert(entry.name.as_str());
        }
    }

    let mut pairs: BTreeMap<(&str, &str), Vec<String>> = BTreeMap::new();
    for (file, names) in &names_per_file {
        let names: Vec<&str> = names.iter().copied().collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                pairs.entry((*a, *b)).or_default().push(file.clone());
            }
        }
    }

    let threshold = min_shared_files.max(1);
    let mut findings: Vec<CooccurrencePair> = pairs
        .into_iter()
        .filter(|(_, files)| files.len() >= threshold)
        .map(|((a, b), shared_files)| CooccurrencePair {
            symbol_a: a.to_string(),
            symbol_b: b.to_string(),
            shared_files,
        })
        .collect();
    findings.sort_by(|a, b| b.shared_files.len().cmp(&a.shared_files.len()));
    findings
}
