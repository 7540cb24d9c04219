use std::collections::BTreeSet;

use super::{Hotspot, is_unit_kind};
use crate::index::SymbolIndex;

/// Functions, classes and interfaces referenced at least `threshold` times.
#[must_use]
pub fn detect(index: &SymbolIndex, threshold: usize) -> Vec<Hotspot> {
    let mut findings: Vec<Hotspot> = index
        .entries()
        .iter()
        .filter(|entry| is_unit_kind(entry.kind))
        .filter_map(|entry| {
            let references = entry.external_references()?;
            if references.len() < threshold.max(1) {
                return None;
            }
            let referencing_files: BTreeSet<String> = references
                .iter()
                .map(|loc| index.display_uri(&loc.uri))
                .collect();
            Some(Hotspot {
                symbol: index.symbol_ref(entry),
                reference_count: references.len(),
                referencing_files: referencing_files.into_iter().collect(),
            })
        })
        .collect();
    findings.sort_by(|a, b| b.reference_count.cmp(&a.reference_count));
    findings
}
