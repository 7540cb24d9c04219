use std::collections::BTreeSet;

use super::SimilarTypePair;
use crate::index::{SymbolEntry, SymbolIndex};
use crate::text::type_properties;

/// Jaccard similarity of two property sets.
#[must_use]
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Type pairs whose property sets overlap by at least `floor` (Jaccard) and
/// share at least `min_shared` names.
#[must_use]
pub fn detect(index: &SymbolIndex, floor: f64, min_shared: usize) -> Vec<SimilarTypePair> {
    let types: Vec<(&SymbolEntry, BTreeSet<String>)> = index
        .entries()
        .iter()
        .filter(|entry| entry.kind.is_type_like())
        .filter_map(|entry| {
            let text = index.file_text(&entry.file)?;
            let properties: BTreeSet<String> =
                type_properties(text, entry.selection_range.start).into_iter().collect();
            (!properties.is_empty()).then_some((entry, properties))
        })
        .collect();

    let mut findings = Vec::new();
    for (i, (a, props_a)) in types.iter().enumerate() {
        for (b, props_b) in &types[i + 1..] {
            let shared: Vec<String> = props_a.intersection(props_b).cloned().collect();
            if shared.len() < min_shared {
                continue;
            }
            let similarity = jaccard(props_a, props_b);
            if similarity >= floor {
                findings.push(SimilarTypePair {
                    type_a: index.symbol_ref(a),
                    type_b: index.symbol_ref(b),
                    shared_properties: shared,
                    similarity,
                });
            }
        }
    }
    findings.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    findings
}
