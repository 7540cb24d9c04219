use std::collections::BTreeMap;

use super::SignatureGroup;
use crate::index::SymbolIndex;
use crate::text::normalize_signature;

/// Group functions and methods whose hover signatures normalize to the same
/// shape. Groups need at least two distinct symbols.
#[must_use]
pub fn detect(index: &SymbolIndex) -> Vec<SignatureGroup> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, entry) in index.entries().iter().enumerate() {
        if !entry.kind.is_callable() {
            continue;
        }
        let Some(signature) = entry.hover.as_deref().and_then(normalize_signature) else {
            continue;
        };
        groups.entry(signature).or_default().push(i);
    }

    let entries = index.entries();
    let mut findings: Vec<SignatureGroup> = groups
        .into_iter()
        .filter_map(|(signature, mut members)| {
            // One symbol reported twice (e.g. an overload list) is not a group.
            members.dedup_by(|a, b| {
                entries[*a].qualified_name == entries[*b].qualified_name
                    && entries[*a].file == entries[*b].file
            });
            (members.len() >= 2).then(|| SignatureGroup {
                signature,
                members: members
                    .into_iter()
                    .map(|i| index.symbol_ref(&entries[i]))
                    .collect(),
            })
        })
        .collect();

    // Stable sort keeps the signature order among equal sizes.
    findings.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
    findings
}
